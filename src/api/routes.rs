//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use crate::api::websocket::ws_handler;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // WebSocket transaction stream
        .route("/ws", get(ws_handler))
        // Session
        .route("/api/session", get(handlers::get_session))
        .route("/api/account", get(handlers::get_account))
        .route("/api/account", put(handlers::set_account))
        // Artifacts
        .route("/api/artifacts", get(handlers::list_artifacts))
        // Wildcard: source ids are paths like "contracts/Token.json"
        .route("/api/artifacts/{*source_id}", post(handlers::load_artifact))
        // Deployment
        .route("/api/deploy", post(handlers::deploy))
        // Instances
        .route("/api/instances", get(handlers::list_instances))
        .route("/api/instances/{id}", get(handlers::get_instance))
        .route("/api/instances/{id}", delete(handlers::dispose_instance))
        .route("/api/instances/{id}/call", post(handlers::call_instance))
        .route("/api/instances/{id}/tx", post(handlers::tx_instance))
        .route(
            "/api/instances/{id}/state/{fn}",
            delete(handlers::dispose_state),
        )
        // History
        .route("/api/history", get(handlers::get_history))
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}
