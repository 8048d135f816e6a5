//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use crate::api::websocket::ws_handler;
use axum::{
    routing::{get, post},
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
        // WebSocket for real-time notifications
        .route("/ws", get(ws_handler))
        // Ledgers
        .route("/api/ledgers", get(handlers::list_ledgers))
        .route("/api/ledgers", post(handlers::create_ledger))
        .route("/api/ledgers/{address}", get(handlers::get_ledger))
        .route(
            "/api/ledgers/{address}/balance",
            get(handlers::get_balance),
        )
        .route("/api/ledgers/{address}/events", get(handlers::get_events))
        .route("/api/ledgers/{address}/deposit", post(handlers::deposit))
        // Operations
        .route(
            "/api/ledgers/{address}/operations",
            get(handlers::list_operations),
        )
        .route(
            "/api/ledgers/{address}/operations",
            post(handlers::submit_operation),
        )
        .route(
            "/api/ledgers/{address}/operations/{index}",
            get(handlers::get_operation),
        )
        .route(
            "/api/ledgers/{address}/operations/{index}/confirm",
            post(handlers::confirm_operation),
        )
        .route(
            "/api/ledgers/{address}/operations/{index}/execute",
            post(handlers::execute_operation),
        )
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}
