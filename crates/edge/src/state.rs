//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::EdgeConfig;

/// Application state shared across all handlers and middleware.
///
/// Read-only after startup and cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<EdgeConfig>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: EdgeConfig) -> Self {
        Self {
            inner: Arc::new(config),
        }
    }

    /// Edge configuration.
    #[must_use]
    pub fn config(&self) -> &EdgeConfig {
        &self.inner
    }
}
