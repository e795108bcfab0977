//! Community edge - request-time device redirect gate.
//!
//! Sits in front of the built web surfaces and, before anything is served,
//! sends each visitor to the host built for their device. Requests that pass
//! the gate are answered from the site directory.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`middleware`] - Redirect gate, request IDs, security headers
//! - [`routes`] - Health probes
//! - [`state`] - Shared application state

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{Router, http::Request, middleware::from_fn, middleware::from_fn_with_state};
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use config::EdgeConfig;
pub use state::AppState;

/// Build the edge router.
///
/// Health routes are matched first; every other path falls through to the
/// site directory. The redirect gate wraps both.
pub fn app(state: AppState) -> Router {
    let site = ServeDir::new(&state.config().site_dir).append_index_html_on_directories(true);

    routes::routes()
        .fallback_service(site)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::device_redirect_middleware,
        ))
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
