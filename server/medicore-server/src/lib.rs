//! MediCore HMS Server - hospital management REST API
//!
//! This library provides the HTTP surface of the MediCore hospital management
//! system: JWT-authenticated CRUD over patients, doctors, appointments,
//! treatments, lab tests, bills, and users, plus role-scoped dashboards.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use error::*;
pub use server::MediCoreServer;

use axum::Router;
use tower_http::trace::TraceLayer;

/// Create the main application router with all routes and middleware
pub fn create_app(server: MediCoreServer) -> Router {
    routes::create_routes()
        .fallback(unknown_route)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::create_cors_layer())
        .with_state(server)
}

async fn unknown_route() -> error::ApiError {
    error::ApiError::not_found("Route")
}
