//! HTTP routes for the edge.
//!
//! Everything that is not a health check falls through to the built site.

mod health;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Build the health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}
