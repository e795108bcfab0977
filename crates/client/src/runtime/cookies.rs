//! Script-visible cookie jar.
//!
//! Models what page script sees through `document.cookie`: cookies written
//! by the page itself. HTTP-only cookies set by the backend never appear
//! here.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, TimeDelta, Utc};
use cookie::Cookie;

use super::storage::StorageError;

/// Cookie access for the current document.
pub trait CookieJar: Send + Sync {
    /// Write a cookie. A `Max-Age` of zero or less deletes it.
    ///
    /// Expired cookies are dropped on every write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if cookies are blocked.
    fn set(&self, cookie: Cookie<'static>) -> Result<(), StorageError>;

    /// Current value of a live cookie.
    fn get(&self, name: &str) -> Option<String>;
}

#[derive(Debug, Clone)]
struct StoredCookie {
    cookie: Cookie<'static>,
    expires_at: Option<DateTime<Utc>>,
}

/// In-memory cookie jar honouring `Max-Age`.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: RwLock<HashMap<String, StoredCookie>>,
}

impl MemoryCookieJar {
    /// Create an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Full cookie as last written (including attributes), if still live.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        cookies
            .get(name)
            .filter(|stored| is_live(stored, Utc::now()))
            .map(|stored| stored.cookie.clone())
    }

    /// Names of all live cookies.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let now = Utc::now();
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = cookies
            .iter()
            .filter(|(_, stored)| is_live(stored, now))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl CookieJar for MemoryCookieJar {
    fn set(&self, cookie: Cookie<'static>) -> Result<(), StorageError> {
        let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        cookies.retain(|_, stored| is_live(stored, now));
        let name = cookie.name().to_owned();

        let max_age = cookie.max_age().map(cookie::time::Duration::whole_seconds);
        if max_age.is_some_and(|seconds| seconds <= 0) {
            cookies.remove(&name);
            return Ok(());
        }

        let expires_at = max_age.map(|seconds| now + TimeDelta::seconds(seconds));
        cookies.insert(name, StoredCookie { cookie, expires_at });
        Ok(())
    }

    fn get(&self, name: &str) -> Option<String> {
        self.cookie(name).map(|cookie| cookie.value().to_owned())
    }
}

fn is_live(stored: &StoredCookie, now: DateTime<Utc>) -> bool {
    stored.expires_at.is_none_or(|at| at > now)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cookie::SameSite;
    use cookie::time::Duration;

    fn session_cookie(value: &str, max_age: i64) -> Cookie<'static> {
        Cookie::build(("accessToken", value.to_owned()))
            .path("/")
            .domain(".community.com")
            .max_age(Duration::seconds(max_age))
            .same_site(SameSite::Lax)
            .build()
    }

    #[test]
    fn test_set_and_get() {
        let jar = MemoryCookieJar::new();
        jar.set(session_cookie("abc", 3600)).unwrap();
        assert_eq!(jar.get("accessToken").as_deref(), Some("abc"));

        let stored = jar.cookie("accessToken").unwrap();
        assert_eq!(stored.same_site(), Some(SameSite::Lax));
        assert_eq!(stored.path(), Some("/"));
    }

    #[test]
    fn test_zero_max_age_deletes() {
        let jar = MemoryCookieJar::new();
        jar.set(session_cookie("abc", 3600)).unwrap();
        jar.set(session_cookie("", 0)).unwrap();
        assert!(jar.get("accessToken").is_none());
        assert!(jar.names().is_empty());

        // Deleting again is harmless
        jar.set(session_cookie("", 0)).unwrap();
        assert!(jar.get("accessToken").is_none());
    }

    #[test]
    fn test_replacing_keeps_latest() {
        let jar = MemoryCookieJar::new();
        jar.set(session_cookie("one", 3600)).unwrap();
        jar.set(session_cookie("two", 3600)).unwrap();
        assert_eq!(jar.get("accessToken").as_deref(), Some("two"));
        assert_eq!(jar.names(), vec!["accessToken".to_string()]);
    }

    #[test]
    fn test_session_cookie_without_max_age_is_live() {
        let jar = MemoryCookieJar::new();
        jar.set(Cookie::new("theme", "dark")).unwrap();
        assert_eq!(jar.get("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_expired_cookies_are_pruned_on_write() {
        let jar = MemoryCookieJar::new();
        jar.cookies.write().unwrap().insert(
            "stale".to_string(),
            StoredCookie {
                cookie: Cookie::new("stale", "old"),
                expires_at: Some(Utc::now() - TimeDelta::seconds(5)),
            },
        );
        assert!(jar.get("stale").is_none());
        assert_eq!(jar.cookies.read().unwrap().len(), 1);

        jar.set(session_cookie("abc", 60)).unwrap();
        let cookies = jar.cookies.read().unwrap();
        assert_eq!(cookies.len(), 1);
        assert!(cookies.contains_key("accessToken"));
    }
}
