//! Client-side query cache.
//!
//! Results of read calls are stored under a [`QueryKey`]. Mutations do not
//! patch cached data; they mark the affected keys stale
//! ([`QueryClient::invalidate_queries`]) so the next read refetches, or
//! evict them outright ([`QueryClient::remove_queries`]).
//!
//! Concurrent [`QueryClient::fetch_query`] calls for the same key share one
//! request: the first caller fetches while holding the key's gate, the
//! others wait on the gate and then pick up what it stored.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

// ── QueryKey ────────────────────────────────────────────────────────

/// Ordered key segments, e.g. `["me"]` or `["products", "12"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Append one segment.
    pub fn with(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    /// Partial matching: `filter` matches this key when it is a prefix.
    pub fn matches(&self, filter: &QueryKey) -> bool {
        self.0.starts_with(&filter.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

// ── QueryClient ─────────────────────────────────────────────────────

struct Entry {
    data: Value,
    updated_at: Instant,
    /// Value of the client's fill counter when this entry was written.
    fill: u64,
    invalidated: bool,
}

impl Entry {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.invalidated && self.updated_at.elapsed() < stale_time
    }
}

/// Owned query cache. Create one per console session and pass it around;
/// there is no global instance.
#[derive(Default)]
pub struct QueryClient {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    gates: Mutex<HashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>>,
    fills: AtomicU64,
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached data for `key`, stale or not.
    pub fn get_query_data(&self, key: &QueryKey) -> Option<Value> {
        self.entries.lock().get(key).map(|e| e.data.clone())
    }

    /// Store `data` under `key` as a fresh entry.
    pub fn set_query_data(&self, key: &QueryKey, data: Value) {
        self.entries.lock().insert(
            key.clone(),
            Entry {
                data,
                updated_at: Instant::now(),
                fill: self.fills.fetch_add(1, Ordering::SeqCst) + 1,
                invalidated: false,
            },
        );
    }

    /// True when there is no entry, or it is invalidated or older than
    /// `stale_time`.
    pub fn is_stale(&self, key: &QueryKey, stale_time: Duration) -> bool {
        self.entries
            .lock()
            .get(key)
            .map(|e| !e.is_fresh(stale_time))
            .unwrap_or(true)
    }

    /// Mark every entry matching `filter` stale. Data is kept.
    /// Returns the number of entries touched.
    pub fn invalidate_queries(&self, filter: &QueryKey) -> usize {
        let mut entries = self.entries.lock();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.matches(filter) {
                entry.invalidated = true;
                count += 1;
            }
        }
        debug!("invalidated {} entries under {}", count, filter);
        count
    }

    /// Evict every entry matching `filter`. Returns the number removed.
    pub fn remove_queries(&self, filter: &QueryKey) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.matches(filter));
        let count = before - entries.len();
        debug!("removed {} entries under {}", count, filter);
        count
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn fresh(&self, key: &QueryKey, stale_time: Duration) -> Option<Value> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|e| e.is_fresh(stale_time))
            .map(|e| e.data.clone())
    }

    fn filled_since(&self, key: &QueryKey, since: u64) -> Option<Value> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|e| !e.invalidated && e.fill > since)
            .map(|e| e.data.clone())
    }

    /// Return cached data for `key` if still fresh, otherwise run `fetcher`
    /// and cache its result. Errors are returned and never cached.
    ///
    /// A caller that waited on another caller's in-flight fetch for the
    /// same key takes that result even when `stale_time` is zero.
    pub async fn fetch_query<F, Fut, E>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
        fetcher: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(data) = self.fresh(key, stale_time) {
            debug!("cache hit {}", key);
            return Ok(data);
        }

        let seen = self.fills.load(Ordering::SeqCst);
        let gate = self.gates.lock().entry(key.clone()).or_default().clone();
        let result = {
            let _guard = gate.lock().await;

            let filled = self
                .fresh(key, stale_time)
                .or_else(|| self.filled_since(key, seen));
            match filled {
                Some(data) => {
                    debug!("cache filled by concurrent fetch {}", key);
                    Ok(data)
                }
                None => {
                    debug!("cache miss {}, fetching", key);
                    match fetcher().await {
                        Ok(data) => {
                            self.set_query_data(key, data.clone());
                            Ok(data)
                        }
                        Err(e) => Err(e),
                    }
                }
            }
        };

        let mut gates = self.gates.lock();
        let ours = gates.get(key).is_some_and(|g| Arc::ptr_eq(g, &gate));
        if ours && Arc::strong_count(&gate) == 2 {
            gates.remove(key);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn key(parts: &[&str]) -> QueryKey {
        QueryKey::new(parts.iter().copied())
    }

    #[test]
    fn prefix_matching() {
        let products = key(&["products"]);
        assert!(key(&["products", "1"]).matches(&products));
        assert!(products.matches(&products));
        assert!(!key(&["product"]).matches(&products));
        assert!(!products.matches(&key(&["products", "1"])));
        assert_eq!(key(&["products", "1"]).to_string(), "[products, 1]");
    }

    #[test]
    fn invalidate_keeps_data_remove_evicts() {
        let cache = QueryClient::new();
        let me = key(&["me"]);
        cache.set_query_data(&me, serde_json::json!({"id": 1}));
        assert!(!cache.is_stale(&me, MINUTE));

        assert_eq!(cache.invalidate_queries(&me), 1);
        assert!(cache.is_stale(&me, MINUTE));
        assert_eq!(cache.get_query_data(&me), Some(serde_json::json!({"id": 1})));

        assert_eq!(cache.remove_queries(&me), 1);
        assert!(cache.get_query_data(&me).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_by_prefix() {
        let cache = QueryClient::new();
        cache.set_query_data(&key(&["products", "a"]), Value::Null);
        cache.set_query_data(&key(&["products", "b"]), Value::Null);
        cache.set_query_data(&key(&["shipments"]), Value::Null);

        assert_eq!(cache.invalidate_queries(&key(&["products"])), 2);
        assert!(!cache.is_stale(&key(&["shipments"]), MINUTE));
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn fresh_entry_skips_fetch() {
        let cache = QueryClient::new();
        let k = key(&["dashboard-stats"]);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let v = cache
                .fetch_query(&k, MINUTE, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(serde_json::json!(42))
                })
                .await
                .unwrap();
            assert_eq!(v, serde_json::json!(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_stale_time_always_refetches() {
        let cache = QueryClient::new();
        let k = key(&["products"]);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .fetch_query(&k, Duration::ZERO, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(Value::Null)
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidated_entry_is_refetched() {
        let cache = QueryClient::new();
        let k = key(&["me"]);
        cache.set_query_data(&k, serde_json::json!("old"));
        cache.invalidate_queries(&k);

        let v = cache
            .fetch_query(&k, MINUTE, || async { Ok::<_, ()>(serde_json::json!("new")) })
            .await
            .unwrap();
        assert_eq!(v, serde_json::json!("new"));
        assert!(!cache.is_stale(&k, MINUTE));
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = QueryClient::new();
        let k = key(&["me"]);
        let err = cache
            .fetch_query(&k, MINUTE, || async { Err::<Value, _>("boom") })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.get_query_data(&k).is_none());
    }

    #[tokio::test]
    async fn concurrent_fetches_are_deduplicated() {
        let cache = Arc::new(QueryClient::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let k = key(&["system-permissions"]);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let k = k.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .fetch_query(&k, Duration::ZERO, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, ()>(serde_json::json!(["employee_view"]))
                    })
                    .await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), serde_json::json!(["employee_view"]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
