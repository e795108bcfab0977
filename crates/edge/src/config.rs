//! Edge configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `EDGE_HOST` - Bind address (default: 127.0.0.1)
//! - `EDGE_PORT` - Listen port (default: 3000)
//! - `EDGE_SITE_DIR` - Built site served behind the gate (default: `site`)
//! - `EDGE_PUBLIC_SCHEME` - Scheme used in redirects when no `x-forwarded-proto` is present (default: https)
//! - `EDGE_DESKTOP_MARKER` - Desktop host prefix (default: `www.`)
//! - `EDGE_MOBILE_MARKER` - Mobile host prefix (default: `m.`)
//! - `EDGE_EXEMPT_PATHS` - Comma separated path prefixes never redirected
//!   (default: `/api,/_next/static,/_next/image,/favicon.ico,/static,/health`)
//! - `EDGE_PERMANENT_MAX_AGE` - `Cache-Control` max-age on permanent redirects (default: 3600)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use community_core::RedirectPolicy;
use community_core::routing::{DESKTOP_MARKER, MOBILE_MARKER};
use thiserror::Error;

/// Path prefixes the redirect gate never inspects.
pub const DEFAULT_EXEMPT_PATHS: &[&str] = &[
    "/api",
    "/_next/static",
    "/_next/image",
    "/favicon.ico",
    "/static",
    "/health",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Edge server configuration.
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory of the built site
    pub site_dir: PathBuf,
    /// Scheme for redirect URLs when the proxy does not say
    pub public_scheme: String,
    /// Host routing policy (bare-host promotion enabled)
    pub redirect_policy: RedirectPolicy,
    /// Path prefixes never redirected
    pub exempt_paths: Vec<String>,
    /// Cache lifetime of permanent redirects, in seconds
    pub permanent_max_age: u32,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            site_dir: PathBuf::from("site"),
            public_scheme: "https".to_string(),
            redirect_policy: RedirectPolicy::default().with_bare_host_promotion(true),
            exempt_paths: DEFAULT_EXEMPT_PATHS.iter().map(ToString::to_string).collect(),
            permanent_max_age: 3600,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

impl EdgeConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("EDGE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("EDGE_HOST".to_string(), e.to_string()))?;

        let port = get_env_or_default("EDGE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("EDGE_PORT".to_string(), e.to_string()))?;

        let site_dir = PathBuf::from(get_env_or_default("EDGE_SITE_DIR", "site"));

        let public_scheme = get_env_or_default("EDGE_PUBLIC_SCHEME", "https").to_ascii_lowercase();
        if !matches!(public_scheme.as_str(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "EDGE_PUBLIC_SCHEME".to_string(),
                format!("expected 'http' or 'https', got '{public_scheme}'"),
            ));
        }

        let redirect_policy = RedirectPolicy::new(
            &get_env_or_default("EDGE_DESKTOP_MARKER", DESKTOP_MARKER),
            &get_env_or_default("EDGE_MOBILE_MARKER", MOBILE_MARKER),
        )
        .map_err(|e| ConfigError::InvalidEnvVar("EDGE_*_MARKER".to_string(), e.to_string()))?
        .with_bare_host_promotion(true);

        let exempt_paths = get_optional_env("EDGE_EXEMPT_PATHS").map_or_else(
            || Ok(DEFAULT_EXEMPT_PATHS.iter().map(ToString::to_string).collect()),
            |raw| parse_exempt_paths(&raw),
        )?;

        let permanent_max_age = get_env_or_default("EDGE_PERMANENT_MAX_AGE", "3600")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("EDGE_PERMANENT_MAX_AGE".to_string(), e.to_string())
            })?;

        Ok(Self {
            host,
            port,
            site_dir,
            public_scheme,
            redirect_policy,
            exempt_paths,
            permanent_max_age,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: parse_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the redirect gate skips this path.
    #[must_use]
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_exempt_paths(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with('/') {
                Ok(p.trim_end_matches('/').to_string())
            } else {
                Err(ConfigError::InvalidEnvVar(
                    "EDGE_EXEMPT_PATHS".to_string(),
                    format!("'{p}' must start with '/'"),
                ))
            }
        })
        .collect()
}

fn parse_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    let rate = raw
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be between 0.0 and 1.0".to_string(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_exempt_paths() {
        let config = EdgeConfig::default();
        assert!(config.is_exempt("/api"));
        assert!(config.is_exempt("/api/v1/posts"));
        assert!(config.is_exempt("/_next/static/chunks/app.js"));
        assert!(config.is_exempt("/favicon.ico"));
        assert!(config.is_exempt("/health/ready"));
        assert!(!config.is_exempt("/"));
        assert!(!config.is_exempt("/apiary"));
        assert!(!config.is_exempt("/posts/1"));
    }

    #[test]
    fn test_parse_exempt_paths() {
        let paths = parse_exempt_paths(" /api/ , /assets ,,").unwrap();
        assert_eq!(paths, vec!["/api".to_string(), "/assets".to_string()]);
        assert!(parse_exempt_paths("api").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = EdgeConfig::default();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
    }
}
