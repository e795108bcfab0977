//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable until the site directory exists.
pub async fn readiness(State(state): State<AppState>) -> Result<StatusCode> {
    let site_dir = &state.config().site_dir;
    match tokio::fs::metadata(site_dir).await {
        Ok(meta) if meta.is_dir() => Ok(StatusCode::OK),
        Ok(_) => Err(AppError::Unavailable(format!(
            "{} is not a directory",
            site_dir.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::Unavailable(
            format!("{} does not exist", site_dir.display()),
        )),
        Err(e) => Err(e.into()),
    }
}
