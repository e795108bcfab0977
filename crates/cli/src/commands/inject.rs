//! Print the WebView session seeding script.

use community_client::{ClientConfig, injection_script};
use community_core::UserId;

use super::CommandError;

/// Print the script for the given credential.
///
/// The cookie domain and lifetime default to the client configuration.
///
/// # Errors
///
/// Returns an error if the token is blank or the client configuration is
/// invalid.
#[allow(clippy::print_stdout)]
pub fn print_script(
    token: &str,
    user_id: Option<i64>,
    cookie_domain: Option<String>,
) -> Result<(), CommandError> {
    if token.trim().is_empty() {
        return Err(CommandError::InvalidArgument("token is empty".to_string()));
    }

    let config = ClientConfig::from_env()?;
    let domain = cookie_domain.unwrap_or(config.cookie_domain);
    tracing::info!(cookie_domain = %domain, user_id, "Building injection script");

    println!(
        "{}",
        injection_script(
            Some(token),
            user_id.map(UserId::new),
            &domain,
            config.cookie_max_age
        )
    );
    Ok(())
}
