pub mod auth_context;
pub mod extractors;

pub use auth_context::AuthContext;
pub use extractors::AppJson;

use tower_http::cors::CorsLayer;

/// Permissive CORS, matching the open policy of the public API.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
