//! HTTP server
//!
//! This module wires the REST endpoints, the announcement reader and the
//! optional static UI into one axum router.

pub mod announcement;
pub mod error;
pub mod messages;
pub mod rest;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Create the server router
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();

    let router = Router::new()
        // Service endpoints
        .route("/health", get(rest::health))
        .route("/api/info", get(rest::service_info))
        .route("/announcement", get(announcement::get_announcement))
        // Batch verification
        .route("/verify", post(rest::verify))
        .route("/progress/:session_id", get(rest::progress))
        // Stress testing
        .route("/stress/start", post(rest::stress_start))
        .route("/stress/query", post(rest::stress_query))
        .route("/stress/stop", post(rest::stress_stop));

    // Unmatched paths go to the static UI when one is configured
    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.fallback(rest::not_found),
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
