//! Cookie jar standing in for `document.cookie`.
//!
//! The jar is scoped to the single backend origin the client talks to, so
//! domain and path attributes are accepted but not matched. It serves two
//! callers: application code (`lastVisitedPage`, `last_mood`, `mood_tracked`)
//! through [`CookieJar::set`] / [`CookieJar::get`], and `reqwest` through the
//! [`CookieStore`] impl, which is how the server's `csrftoken` and session
//! cookies land here.

use super::{load_json_map, save_json_map};
use cookie::Cookie;
use reqwest::{cookie::CookieStore, header::HeaderValue};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use url::Url;

/// Expiry applied by [`CookieJar::set`] when the caller does not pass one.
pub const DEFAULT_COOKIE_DAYS: i64 = 7;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
struct StoredCookie {
    value: String,
    /// Unix seconds; `None` for session cookies.
    expires_at: Option<i64>,
}

/// Unix seconds `lifetime` after `now`. Results past the representable range
/// clamp, so a huge lifetime means "never expires" and a huge negative one
/// means "already expired".
fn expiry_after(now: OffsetDateTime, lifetime: Duration) -> i64 {
    match now.checked_add(lifetime) {
        Some(at) => at.unix_timestamp(),
        None if lifetime.is_negative() => i64::MIN,
        None => i64::MAX,
    }
}

impl StoredCookie {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug)]
pub struct CookieJar {
    entries: RwLock<BTreeMap<String, StoredCookie>>,
    enabled: bool,
    path: Option<PathBuf>,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar {
    /// In-memory jar, dropped with the process.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            enabled: true,
            path: None,
        }
    }

    /// A jar with cookies turned off: writes are ignored and reads find nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// File-backed jar. Expired entries are dropped on load.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut entries: BTreeMap<String, StoredCookie> = load_json_map(&path);
        entries.retain(|_, cookie| !cookie.is_expired(now));

        Self {
            entries: RwLock::new(entries),
            enabled: true,
            path: Some(path),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Writes `name=value` expiring after `days` (default 7). A non-positive
    /// `days` expires the cookie immediately, removing any previous value.
    pub fn set(&self, name: &str, value: &str, days: Option<i64>) {
        let days = days.unwrap_or(DEFAULT_COOKIE_DAYS);
        let lifetime = Duration::seconds(days.saturating_mul(SECONDS_PER_DAY));
        let expires_at = expiry_after(OffsetDateTime::now_utc(), lifetime);
        self.store(
            name,
            StoredCookie {
                value: value.to_string(),
                expires_at: Some(expires_at),
            },
        );
    }

    /// Returns the decoded value, or `None` when the cookie is absent or expired.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(name)
            .filter(|cookie| !cookie.is_expired(now))
            .map(|cookie| cookie.value.clone())
    }

    pub fn remove(&self, name: &str) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(name).is_some() {
            self.persist(&entries);
        }
    }

    fn store(&self, name: &str, cookie: StoredCookie) {
        if !self.enabled {
            return;
        }
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if cookie.is_expired(now) {
            entries.remove(name);
        } else {
            entries.insert(name.to_string(), cookie);
        }
        self.persist(&entries);
    }

    /// Applies one parsed `Set-Cookie`; `Max-Age` wins over `Expires`.
    fn apply(&self, cookie: &Cookie<'_>) {
        let now = OffsetDateTime::now_utc();
        let expires_at = match (cookie.max_age(), cookie.expires_datetime()) {
            (Some(max_age), _) => Some(expiry_after(now, max_age)),
            (None, Some(at)) => Some(at.unix_timestamp()),
            (None, None) => None,
        };

        debug!("cookie received: {}", cookie.name());
        self.store(
            cookie.name(),
            StoredCookie {
                value: cookie.value().to_string(),
                expires_at,
            },
        );
    }

    /// Renders every live cookie as a `Cookie` request header value.
    fn header_value(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let pairs: Vec<String> = entries
            .iter()
            .filter(|(_, cookie)| !cookie.is_expired(now))
            .map(|(name, cookie)| {
                Cookie::new(name.clone(), cookie.value.clone())
                    .encoded()
                    .to_string()
            })
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    fn persist(&self, entries: &BTreeMap<String, StoredCookie>) {
        if let Some(path) = &self.path {
            save_json_map(path, entries);
        }
    }
}

impl CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, _url: &Url) {
        for header in cookie_headers {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            match Cookie::parse_encoded(raw.to_string()) {
                Ok(cookie) => self.apply(&cookie),
                Err(err) => debug!("ignoring malformed Set-Cookie header: {err}"),
            }
        }
    }

    fn cookies(&self, _url: &Url) -> Option<HeaderValue> {
        let header = self.header_value()?;
        HeaderValue::from_str(&header).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://localhost:8000/api/").unwrap()
    }

    #[test]
    fn set_then_get_round_trips() {
        let jar = CookieJar::new();
        jar.set("x", "v", Some(1));
        assert_eq!(jar.get("x").as_deref(), Some("v"));
    }

    #[test]
    fn past_expiry_removes_the_cookie() {
        let jar = CookieJar::new();
        jar.set("x", "v", Some(1));
        jar.set("x", "v", Some(-1));
        assert_eq!(jar.get("x"), None);
    }

    #[test]
    fn default_expiry_is_seven_days() {
        let jar = CookieJar::new();
        jar.set("lastVisitedPage", "/mood", None);
        let entries = jar.entries.read().unwrap();
        let expires_at = entries.get("lastVisitedPage").unwrap().expires_at.unwrap();
        let expected = (OffsetDateTime::now_utc() + Duration::days(7)).unix_timestamp();
        assert!((expected - expires_at).abs() <= 5);
    }

    #[test]
    fn far_future_days_never_expire() {
        let jar = CookieJar::new();
        jar.set("x", "v", Some(10_000_000));
        assert_eq!(jar.get("x").as_deref(), Some("v"));
        jar.set("y", "v", Some(i64::MAX));
        assert_eq!(jar.get("y").as_deref(), Some("v"));
        jar.set("y", "v", Some(i64::MIN));
        assert_eq!(jar.get("y"), None);
    }

    #[test]
    fn huge_max_age_is_kept_without_expiry() {
        let jar = CookieJar::new();
        let headers = [HeaderValue::from_static("sessionid=s; Max-Age=999999999999; Path=/")];
        jar.set_cookies(&mut headers.iter(), &origin());
        assert_eq!(jar.get("sessionid").as_deref(), Some("s"));
        let entries = jar.entries.read().unwrap();
        let expires_at = entries.get("sessionid").unwrap().expires_at.unwrap();
        let century = (OffsetDateTime::now_utc() + Duration::days(36_500)).unix_timestamp();
        assert!(expires_at > century);
    }

    #[test]
    fn disabled_jar_is_a_no_op() {
        let jar = CookieJar::disabled();
        jar.set("x", "v", None);
        assert!(!jar.is_enabled());
        assert_eq!(jar.get("x"), None);
        assert!(jar.cookies(&origin()).is_none());
    }

    #[test]
    fn set_cookie_headers_are_parsed_and_decoded() {
        let jar = CookieJar::new();
        let headers = [
            HeaderValue::from_static("csrftoken=abc123; Path=/; SameSite=Lax"),
            HeaderValue::from_static("lastVisitedPage=%2Fmood; Max-Age=600"),
        ];
        jar.set_cookies(&mut headers.iter(), &origin());

        assert_eq!(jar.get("csrftoken").as_deref(), Some("abc123"));
        assert_eq!(jar.get("lastVisitedPage").as_deref(), Some("/mood"));
    }

    #[test]
    fn max_age_zero_deletes_existing_cookie() {
        let jar = CookieJar::new();
        jar.set("sessionid", "s1", None);
        let headers = [HeaderValue::from_static("sessionid=; Max-Age=0; Path=/")];
        jar.set_cookies(&mut headers.iter(), &origin());
        assert_eq!(jar.get("sessionid"), None);
    }

    #[test]
    fn request_header_joins_live_cookies() {
        let jar = CookieJar::new();
        jar.set("a", "1", None);
        jar.set("b", "two words", None);
        let header = jar.cookies(&origin()).unwrap();
        assert_eq!(header.to_str().unwrap(), "a=1; b=two%20words");
    }

    #[test]
    fn file_backed_jar_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        let jar = CookieJar::open(&path);
        jar.set("mood_tracked", "true", Some(365));
        jar.set("gone", "x", Some(1));
        jar.remove("gone");
        drop(jar);

        let reopened = CookieJar::open(&path);
        assert_eq!(reopened.get("mood_tracked").as_deref(), Some("true"));
        assert_eq!(reopened.get("gone"), None);
    }
}
