//! Dry-run the edge redirect policy.

use std::borrow::Cow;

use community_core::{DeviceInfo, RedirectDecision, RedirectPolicy, device::IN_APP_MARKER};

use super::CommandError;

/// Evaluate the policy and print the outcome.
///
/// # Errors
///
/// Returns `CommandError::InvalidArgument` for an empty host or an unknown
/// scheme.
#[allow(clippy::print_stdout)]
pub fn evaluate(
    target: &str,
    user_agent: Option<&str>,
    in_app: bool,
    scheme: &str,
) -> Result<(), CommandError> {
    println!("{}", describe(target, user_agent, in_app, scheme)?);
    Ok(())
}

/// One line per outcome: `pass`, or `<status> <location>`.
fn describe(
    target: &str,
    user_agent: Option<&str>,
    in_app: bool,
    scheme: &str,
) -> Result<String, CommandError> {
    if !matches!(scheme, "http" | "https") {
        return Err(CommandError::InvalidArgument(format!(
            "scheme must be 'http' or 'https', got '{scheme}'"
        )));
    }

    let (host, path_and_query) = split_target(target);
    if host.is_empty() {
        return Err(CommandError::InvalidArgument("host is empty".to_string()));
    }

    let requested_with = in_app.then_some(IN_APP_MARKER);
    let device = DeviceInfo::from_request_headers(user_agent, requested_with);
    tracing::debug!(
        platform = ?device.platform,
        mobile = device.is_mobile,
        in_app = device.is_in_app,
        "Classified device"
    );

    let policy = RedirectPolicy::default().with_bare_host_promotion(true);
    Ok(policy.evaluate(host, &device).map_or_else(
        || "pass".to_string(),
        |decision: RedirectDecision| {
            format!(
                "{} {}",
                decision.kind.status_code(),
                decision.location(scheme, &path_and_query)
            )
        },
    ))
}

/// Split `host/path?query` into the host and the path with query.
///
/// A query with no path is kept under `/`.
fn split_target(target: &str) -> (&str, Cow<'_, str>) {
    let target = target
        .strip_prefix("https://")
        .or_else(|| target.strip_prefix("http://"))
        .unwrap_or(target);
    match target.find(['/', '?']) {
        Some(idx) => {
            let (host, rest) = target.split_at(idx);
            if rest.starts_with('/') {
                (host, Cow::Borrowed(rest))
            } else {
                (host, Cow::Owned(format!("/{rest}")))
            }
        }
        None => (target, Cow::Borrowed("/")),
    }
}
