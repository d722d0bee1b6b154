use anyhow::Result;
use medicore_server::{create_app, MediCoreServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("medicore_server=info,tower_http=info")),
        )
        .init();

    let server = MediCoreServer::new().await?;

    sqlx::migrate!("./migrations").run(&server.db_pool).await?;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], server.config.port));
    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "MediCore HMS API ready");
    axum::serve(listener, app).await?;

    Ok(())
}
