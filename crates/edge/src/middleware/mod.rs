//! HTTP middleware stack for the edge.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Device redirect (may answer without reaching the site)

pub mod device_redirect;
pub mod request_id;
pub mod security_headers;

pub use device_redirect::device_redirect_middleware;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
