//! Device redirect gate.
//!
//! Runs once per request before anything is served and sends the visitor to
//! the surface built for their device:
//!
//! | in app | mobile | host                                  | action                     |
//! |--------|--------|---------------------------------------|----------------------------|
//! | yes    | any    | any                                   | pass                       |
//! | no     | any    | localhost / IP literal                | pass                       |
//! | no     | no     | mobile marker                         | 301 to desktop host        |
//! | no     | yes    | desktop marker, or no mobile marker   | 302 to mobile host         |
//!
//! Permanent redirects are cacheable; temporary ones are not, since a mobile
//! visitor may come back to the desktop host on purpose.

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, HOST, LOCATION, USER_AGENT, VARY},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use community_core::{DeviceInfo, RedirectDecision, RedirectKind};

use crate::state::AppState;

/// Header the native shell's WebView sets on every request.
pub const REQUESTED_WITH_HEADER: &str = "x-requested-with";

/// Scheme header set by the TLS-terminating proxy.
pub const FORWARDED_PROTO_HEADER: &str = "x-forwarded-proto";

/// Redirect visitors on the wrong surface.
pub async fn device_redirect_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let config = state.config();
    let path = request.uri().path();
    if config.is_exempt(path) {
        return next.run(request).await;
    }

    let headers = request.headers();
    let device = DeviceInfo::from_request_headers(
        header_str(headers, USER_AGENT.as_str()),
        header_str(headers, REQUESTED_WITH_HEADER),
    );
    let host = request_host(&request).unwrap_or_default();

    let Some(decision) = config.redirect_policy.evaluate(&host, &device) else {
        tracing::debug!(host = %host, in_app = device.is_in_app, mobile = device.is_mobile, "Pass through");
        return next.run(request).await;
    };

    let scheme = header_str(headers, FORWARDED_PROTO_HEADER)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| matches!(*v, "http" | "https"))
        .unwrap_or(config.public_scheme.as_str());
    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());
    let location = decision.location(scheme, path_and_query);

    tracing::info!(
        from = %host,
        to = %decision.host,
        status = decision.kind.status_code(),
        "Device redirect"
    );
    redirect_response(&decision, &location, config.permanent_max_age)
}

fn redirect_response(decision: &RedirectDecision, location: &str, max_age: u32) -> Response {
    let Ok(location) = HeaderValue::from_str(location) else {
        tracing::warn!(location, "Redirect target is not a valid header value");
        return StatusCode::BAD_REQUEST.into_response();
    };

    let (status, cache_control) = match decision.kind {
        RedirectKind::Permanent => (
            StatusCode::MOVED_PERMANENTLY,
            HeaderValue::from_str(&format!("public, max-age={max_age}"))
                .unwrap_or_else(|_| HeaderValue::from_static("public")),
        ),
        RedirectKind::Temporary => (StatusCode::FOUND, HeaderValue::from_static("no-store")),
    };

    let mut response = status.into_response();
    let headers = response.headers_mut();
    headers.insert(LOCATION, location);
    headers.insert(CACHE_CONTROL, cache_control);
    headers.insert(
        VARY,
        HeaderValue::from_static("User-Agent, X-Requested-With"),
    );
    response
}

/// Host the visitor asked for, including any port.
fn request_host(request: &Request) -> Option<String> {
    header_str(request.headers(), HOST.as_str())
        .map(ToString::to_string)
        .or_else(|| request.uri().authority().map(ToString::to_string))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
