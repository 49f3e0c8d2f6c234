//! Keyed cache of fetched JSON values.
//!
//! Keys are strings; a key with parameters is written `base:param` (see
//! [`query_key`]) so invalidating `base` drops every parameterized variant.

use crate::client::ApiError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    future::Future,
    sync::{PoisonError, RwLock},
    time::{Duration, Instant},
};
use tracing::{debug, warn};

pub const CURRENT_USER_KEY: &str = "currentUser";
pub const ANALYTICS_DASHBOARD_KEY: &str = "analytics-dashboard";
pub const EMOTIONAL_TIMELINE_KEY: &str = "emotional-timeline";
pub const SUBSCRIPTION_STATUS_KEY: &str = "subscription-status";
pub const ACTIVE_SESSION_KEY: &str = "activeSession";

#[must_use]
pub fn query_key(base: &str, param: impl std::fmt::Display) -> String {
    format!("{base}:{param}")
}

#[derive(Debug)]
struct Entry {
    value: Value,
    stored_at: Instant,
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Returns the entry only if it was stored less than `max_age` ago.
    #[must_use]
    pub fn get_fresh(&self, key: &str, max_age: Duration) -> Option<Value> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < max_age)
            .map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: &str, value: Value) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key.to_string(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn set_typed<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value),
            Err(err) => warn!("query cache: failed to encode {key}: {err}"),
        }
    }

    /// Drops `key` and every `key:*` variant.
    pub fn invalidate(&self, key: &str) {
        let prefix = format!("{key}:");
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|existing, _| existing != key && !existing.starts_with(&prefix));
        debug!("query cache: invalidated {key}");
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(key)
    }

    /// Serves a fresh cached value or runs `fetch` and caches its result.
    /// A cached value that no longer decodes as `T` counts as a miss.
    ///
    /// # Errors
    /// Propagates the error from `fetch`; nothing is cached in that case.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        key: &str,
        max_age: Duration,
        fetch: F,
    ) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(value) = self
            .get_fresh(key, max_age)
            .and_then(|value| serde_json::from_value(value).ok())
        {
            debug!("query cache: hit {key}");
            return Ok(value);
        }

        let value = fetch().await?;
        self.set_typed(key, &value);
        Ok(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_entries_expire_by_age() {
        let cache = QueryCache::new();
        cache.set(CURRENT_USER_KEY, json!({"id": 1}));
        assert!(cache.get_fresh(CURRENT_USER_KEY, Duration::from_secs(60)).is_some());
        assert!(cache.get_fresh(CURRENT_USER_KEY, Duration::ZERO).is_none());
        assert!(cache.get(CURRENT_USER_KEY).is_some());
    }

    #[test]
    fn invalidate_drops_parameterized_variants() {
        let cache = QueryCache::new();
        cache.set(&query_key(ANALYTICS_DASHBOARD_KEY, 30), json!({}));
        cache.set(&query_key(ANALYTICS_DASHBOARD_KEY, 7), json!({}));
        cache.set(ANALYTICS_DASHBOARD_KEY, json!({}));
        cache.set("analytics-dashboardx", json!({}));

        cache.invalidate(ANALYTICS_DASHBOARD_KEY);

        assert!(!cache.contains("analytics-dashboard:30"));
        assert!(!cache.contains("analytics-dashboard:7"));
        assert!(!cache.contains(ANALYTICS_DASHBOARD_KEY));
        assert!(cache.contains("analytics-dashboardx"));
    }

    #[tokio::test]
    async fn get_or_fetch_only_fetches_on_miss() {
        let cache = QueryCache::new();
        let first: u32 = cache
            .get_or_fetch("n", Duration::from_secs(60), || async { Ok(1) })
            .await
            .unwrap();
        let second: u32 = cache
            .get_or_fetch("n", Duration::from_secs(60), || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!((first, second), (1, 1));

        let refreshed: u32 = cache
            .get_or_fetch("n", Duration::ZERO, || async { Ok(3) })
            .await
            .unwrap();
        assert_eq!(refreshed, 3);
    }

    #[tokio::test]
    async fn failed_fetch_caches_nothing() {
        let cache = QueryCache::new();
        let result: Result<u32, _> = cache
            .get_or_fetch("n", Duration::from_secs(60), || async {
                Err(ApiError::Cancelled)
            })
            .await;
        assert!(result.is_err());
        assert!(!cache.contains("n"));
    }
}
