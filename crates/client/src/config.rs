//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `COMMUNITY_API_URL` - Backend base URL (default: `http://localhost:8080/api/v1`)
//! - `COMMUNITY_COOKIE_DOMAIN` - Shared parent domain for session cookies (default: `.community.com`)
//! - `COMMUNITY_COOKIE_MAX_AGE` - Session cookie lifetime in seconds (default: 3600)
//! - `COMMUNITY_CREDENTIAL_MODE` - `bearer` or `cookie` (default: `bearer`)
//! - `COMMUNITY_LOGIN_PATH` - Login page path used after a revoked session (default: `/login`)
//! - `COMMUNITY_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";

/// Default shared cookie domain.
pub const DEFAULT_COOKIE_DOMAIN: &str = ".community.com";

/// Default session cookie lifetime (1 hour, matching the backend access token).
pub const DEFAULT_COOKIE_MAX_AGE: i64 = 3600;

/// Longest session cookie lifetime accepted (7 days, the refresh token lifetime).
const MAX_COOKIE_MAX_AGE: i64 = 7 * 24 * 60 * 60;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How the session credential travels with each request.
///
/// The two modes are alternative deployments and are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialMode {
    /// `Authorization: Bearer` header built from the stored access token.
    #[default]
    Bearer,
    /// HTTP-only cookies set by the backend, sent implicitly.
    Cookie,
}

impl FromStr for CredentialMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bearer" => Ok(Self::Bearer),
            "cookie" => Ok(Self::Cookie),
            other => Err(format!("expected 'bearer' or 'cookie', got '{other}'")),
        }
    }
}

/// Client runtime configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, always ending in `/`.
    pub api_url: Url,
    /// Parent domain shared by the web and mobile-web surfaces.
    pub cookie_domain: String,
    /// Session cookie `Max-Age` in seconds.
    pub cookie_max_age: i64,
    /// Credential transport.
    pub credential_mode: CredentialMode,
    /// Login page path.
    pub login_path: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: parse_api_url(DEFAULT_API_URL).expect("Invalid default API URL"),
            cookie_domain: DEFAULT_COOKIE_DOMAIN.to_string(),
            cookie_max_age: DEFAULT_COOKIE_MAX_AGE,
            credential_mode: CredentialMode::Bearer,
            login_path: "/login".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
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

        let api_url = parse_api_url(&get_env_or_default("COMMUNITY_API_URL", DEFAULT_API_URL))
            .map_err(|e| ConfigError::InvalidEnvVar("COMMUNITY_API_URL".to_string(), e))?;

        let cookie_domain = get_env_or_default("COMMUNITY_COOKIE_DOMAIN", DEFAULT_COOKIE_DOMAIN);
        validate_cookie_domain(&cookie_domain)
            .map_err(|e| ConfigError::InvalidEnvVar("COMMUNITY_COOKIE_DOMAIN".to_string(), e))?;

        let cookie_max_age = get_env_or_default("COMMUNITY_COOKIE_MAX_AGE", "3600")
            .parse::<i64>()
            .map_err(|e| e.to_string())
            .and_then(validate_cookie_max_age)
            .map_err(|e| ConfigError::InvalidEnvVar("COMMUNITY_COOKIE_MAX_AGE".to_string(), e))?;

        let credential_mode = get_env_or_default("COMMUNITY_CREDENTIAL_MODE", "bearer")
            .parse::<CredentialMode>()
            .map_err(|e| ConfigError::InvalidEnvVar("COMMUNITY_CREDENTIAL_MODE".to_string(), e))?;

        let login_path = get_env_or_default("COMMUNITY_LOGIN_PATH", "/login");
        if !login_path.starts_with('/') {
            return Err(ConfigError::InvalidEnvVar(
                "COMMUNITY_LOGIN_PATH".to_string(),
                "must start with '/'".to_string(),
            ));
        }

        let timeout_secs = get_env_or_default("COMMUNITY_REQUEST_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("COMMUNITY_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            api_url,
            cookie_domain,
            cookie_max_age,
            credential_mode,
            login_path,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Same configuration pointed at another backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is not an absolute http(s) URL.
    pub fn with_api_url(mut self, api_url: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_api_url(api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("COMMUNITY_API_URL".to_string(), e))?;
        Ok(self)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse the API base URL, forcing a trailing slash so relative joins keep
/// the version prefix.
fn parse_api_url(raw: &str) -> Result<Url, String> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    Ok(url)
}

fn validate_cookie_domain(domain: &str) -> Result<(), String> {
    let bare = domain.trim_start_matches('.');
    if bare.is_empty() || !bare.contains('.') || bare.contains(['/', ' ', ';']) {
        return Err(format!("'{domain}' is not a parent domain like .community.com"));
    }
    Ok(())
}

fn validate_cookie_max_age(seconds: i64) -> Result<i64, String> {
    if (1..=MAX_COOKIE_MAX_AGE).contains(&seconds) {
        Ok(seconds)
    } else {
        Err(format!("must be between 1 and {MAX_COOKIE_MAX_AGE} seconds"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_gets_trailing_slash() {
        let url = parse_api_url("https://api.community.com/api/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.community.com/api/v1/");
        assert_eq!(
            url.join("auth/login").unwrap().as_str(),
            "https://api.community.com/api/v1/auth/login"
        );
    }

    #[test]
    fn test_api_url_rejects_other_schemes() {
        assert!(parse_api_url("ftp://community.com").is_err());
        assert!(parse_api_url("not a url").is_err());
    }

    #[test]
    fn test_credential_mode_parse() {
        assert_eq!("bearer".parse(), Ok(CredentialMode::Bearer));
        assert_eq!(" Cookie ".parse(), Ok(CredentialMode::Cookie));
        assert!("session".parse::<CredentialMode>().is_err());
    }

    #[test]
    fn test_cookie_domain_validation() {
        assert!(validate_cookie_domain(".community.com").is_ok());
        assert!(validate_cookie_domain("community.com").is_ok());
        assert!(validate_cookie_domain("localhost").is_err());
        assert!(validate_cookie_domain(".").is_err());
        assert!(validate_cookie_domain(".community.com; Secure").is_err());
    }

    #[test]
    fn test_cookie_max_age_bounds() {
        assert_eq!(validate_cookie_max_age(3600), Ok(3600));
        assert!(validate_cookie_max_age(0).is_err());
        assert!(validate_cookie_max_age(MAX_COOKIE_MAX_AGE + 1).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url.as_str(), "http://localhost:8080/api/v1/");
        assert_eq!(config.cookie_max_age, 3600);
        assert_eq!(config.credential_mode, CredentialMode::Bearer);
        assert_eq!(config.login_path, "/login");
    }
}
