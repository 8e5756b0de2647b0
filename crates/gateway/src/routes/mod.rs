//! HTTP routes for the gateway.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health              - Liveness check
//! GET  /health/ready        - Capability registry reachable
//! GET  /tools               - Tool catalogue
//! POST /tools/{name}        - Invoke a tool; JSON body is the tool input
//! ```

pub mod health;
pub mod tools;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the tool routes router.
pub fn tool_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(tools::list))
        .route("/{name}", post(tools::invoke))
}

/// Create all routes for the gateway.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/tools", tool_routes())
}
