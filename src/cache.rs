// src/cache.rs
// =============================================================================
// Time-bounded key/value entries ("transients") and the result cache built
// on top of them.
//
// Transients live inside the snapshot's state, so a cached scan survives
// between CLI runs until it expires or is invalidated. Expired entries read
// as absent and are dropped on read.
//
// The clock is passed in rather than read globally so expiry can be tested.
// =============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, warn};

use crate::error::Result;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transient {
    pub value: Value,
    /// None = never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Transients(BTreeMap<String, Transient>);

impl Transients {
    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let expired = match self.0.get(key) {
            None => return None,
            Some(entry) => entry.expires_at.is_some_and(|at| at <= now),
        };

        if expired {
            debug!(key, "transient expired");
            self.0.remove(key);
            return None;
        }

        self.0.get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&mut self, key: &str, value: Value, ttl: Option<Duration>, now: DateTime<Utc>) {
        let expires_at = ttl.map(|ttl| now + ttl);
        self.0.insert(key.to_string(), Transient { value, expires_at });
    }

    // Returns true when an entry was actually removed
    pub fn delete(&mut self, key: &str) -> bool {
        self.0.remove(key).is_some()
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

// Memoizes one computation per key in a transient table
pub struct ResultCache<'a, C: Clock> {
    table: &'a mut Transients,
    clock: &'a C,
}

impl<'a, C: Clock> ResultCache<'a, C> {
    pub fn new(table: &'a mut Transients, clock: &'a C) -> Self {
        ResultCache { table, clock }
    }

    /// Returns the cached value for `key` if present and unexpired, otherwise
    /// runs `compute`, stores its result for `ttl` and returns it.
    pub async fn get_or_compute<T, F, Fut>(&mut self, key: &str, ttl: Duration, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(cached) = self.table.get(key, self.clock.now()) {
            match serde_json::from_value(cached) {
                Ok(value) => {
                    debug!(key, "cache hit");
                    return Ok(value);
                }
                // A blob written by an older layout is as good as absent
                Err(e) => warn!(key, error = %e, "discarding unreadable cache entry"),
            }
        }

        debug!(key, "cache miss, computing");
        let value = compute().await;
        // Stamp with the time the result was produced, not when we started
        self.table
            .set(key, serde_json::to_value(&value)?, Some(ttl), self.clock.now());
        Ok(value)
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.table.delete(key)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;

    // Clock the tests can move forward by hand
    pub(crate) struct ManualClock(pub Cell<DateTime<Utc>>);

    impl ManualClock {
        pub(crate) fn new() -> Self {
            ManualClock(Cell::new(
                DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
            ))
        }

        pub(crate) fn advance(&self, by: Duration) {
            self.0.set(self.0.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.get()
        }
    }

    #[tokio::test]
    async fn test_compute_runs_once_within_ttl() {
        let clock = ManualClock::new();
        let mut table = Transients::default();
        let calls = Cell::new(0);
        let counter = &calls;
        let mut cache = ResultCache::new(&mut table, &clock);

        let first: Vec<String> = cache
            .get_or_compute("scan", Duration::hours(1), || async move {
                counter.set(counter.get() + 1);
                vec!["http://a.test/x".to_string()]
            })
            .await
            .unwrap();

        clock.advance(Duration::minutes(59));

        let second: Vec<String> = cache
            .get_or_compute("scan", Duration::hours(1), || async move {
                counter.set(counter.get() + 1);
                Vec::new()
            })
            .await
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_recompute_after_expiry_and_invalidate() {
        let clock = ManualClock::new();
        let mut table = Transients::default();
        let calls = Cell::new(0);
        let counter = &calls;
        let mut cache = ResultCache::new(&mut table, &clock);

        let compute = || async move {
            counter.set(counter.get() + 1);
            counter.get()
        };

        assert_eq!(cache.get_or_compute("k", Duration::hours(1), compute).await.unwrap(), 1);
        clock.advance(Duration::hours(1));
        assert_eq!(cache.get_or_compute("k", Duration::hours(1), compute).await.unwrap(), 2);

        assert!(cache.invalidate("k"));
        assert!(!cache.invalidate("k"));
        assert_eq!(cache.get_or_compute("k", Duration::hours(1), compute).await.unwrap(), 3);
    }

    #[test]
    fn test_transient_without_ttl_never_expires() {
        let clock = ManualClock::new();
        let mut table = Transients::default();
        table.set("note", Value::from("hi"), None, clock.now());
        clock.advance(Duration::days(365));
        assert_eq!(table.get("note", clock.now()), Some(Value::from("hi")));
    }

    #[test]
    fn test_expired_transient_is_dropped() {
        let clock = ManualClock::new();
        let mut table = Transients::default();
        table.set("msg", Value::from("done"), Some(Duration::seconds(30)), clock.now());
        clock.advance(Duration::seconds(31));
        assert_eq!(table.get("msg", clock.now()), None);
        assert!(!table.contains("msg"));
    }
}
