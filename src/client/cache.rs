// SPDX-License-Identifier: MIT OR Apache-2.0

//! GET response cache.
//!
//! Entries hold the raw response bytes of a successful GET, keyed by the
//! normalised method, URL, query and filter. The TTL is read at lookup time,
//! so changing it affects entries that are already stored. Expired entries
//! are dropped when looked up and swept on every insert. Mutating requests
//! never invalidate anything on their own; callers clear the cache explicitly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use tokio::time::Instant;
use url::Url;

/// Default lifetime of a cached response.
pub const DEFAULT_CACHE_EXPIRATION: Duration = Duration::from_secs(15 * 60);

/// Build the cache key for a request.
///
/// Query pairs are sorted so that parameter order does not split entries.
#[must_use]
pub fn cache_key(method: &Method, url: &Url, filter: Option<&str>) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    let mut key = format!("{} {}{}", method, url.origin().ascii_serialization(), url.path());
    for (i, (k, v)) in pairs.iter().enumerate() {
        key.push(if i == 0 { '?' } else { '&' });
        key.push_str(k);
        key.push('=');
        key.push_str(v);
    }
    if let Some(filter) = filter {
        key.push_str(" filter=");
        key.push_str(filter);
    }
    key
}

/// A cached response body.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    path: String,
    body: Bytes,
    inserted_at: Instant,
}

impl CacheEntry {
    /// URL path the entry was stored for.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw response body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the entry is older than `ttl`. A zero TTL expires everything.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

/// Concurrent GET response cache owned by one client.
#[derive(Debug)]
pub struct ResponseCache {
    enabled: AtomicBool,
    expiration: RwLock<Duration>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_EXPIRATION)
    }
}

impl ResponseCache {
    /// Create an enabled cache with the given TTL.
    #[must_use]
    pub fn new(expiration: Duration) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            expiration: RwLock::new(expiration),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Whether lookups and population are active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Toggle lookups and population. Stored entries are kept.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Current TTL.
    #[must_use]
    pub fn expiration(&self) -> Duration {
        *self.expiration.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the TTL applied on every lookup.
    pub fn set_expiration(&self, expiration: Duration) {
        *self
            .expiration
            .write()
            .unwrap_or_else(PoisonError::into_inner) = expiration;
    }

    /// Look up a live entry. An expired entry is a miss and is dropped.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Bytes> {
        if !self.is_enabled() {
            return None;
        }
        let ttl = self.expiration();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(ttl) => return Some(entry.body.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have refreshed it between the two locks.
        if entries.get(key).is_some_and(|entry| entry.is_expired(ttl)) {
            entries.remove(key);
        }
        None
    }

    /// Store a response body, sweeping out expired entries. No-op while the
    /// cache is disabled.
    pub fn insert(&self, key: String, path: &str, body: Bytes) {
        if !self.is_enabled() {
            return;
        }
        let ttl = self.expiration();
        let entry = CacheEntry {
            path: path.to_string(),
            body,
            inserted_at: Instant::now(),
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, stored| !stored.is_expired(ttl));
        entries.insert(key, entry);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Drop entries whose URL path ends with `endpoint`, returning how many went.
    pub fn invalidate_endpoint(&self, endpoint: &str) -> usize {
        let suffix = format!("/{}", endpoint.trim_matches('/'));
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.path.trim_end_matches('/').ends_with(&suffix));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_cache_key_sorts_query() {
        let a = cache_key(
            &Method::GET,
            &url("https://api.linode.com/v4/regions?page_size=50&page=2"),
            None,
        );
        let b = cache_key(
            &Method::GET,
            &url("https://api.linode.com/v4/regions?page=2&page_size=50"),
            None,
        );
        assert_eq!(a, b);
        assert_eq!(a, "GET https://api.linode.com/v4/regions?page=2&page_size=50");
    }

    #[test]
    fn test_cache_key_includes_filter() {
        let u = url("https://api.linode.com/v4/regions");
        let plain = cache_key(&Method::GET, &u, None);
        let filtered = cache_key(&Method::GET, &u, Some(r#"{"country":"us"}"#));
        assert_ne!(plain, filtered);
    }

    #[test]
    fn test_insert_and_get() {
        let cache = ResponseCache::default();
        cache.insert("k".into(), "/v4/regions", Bytes::from_static(b"{}"));
        assert_eq!(cache.get("k"), Some(Bytes::from_static(b"{}")));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_disabled_cache_bypasses_but_keeps_entries() {
        let cache = ResponseCache::default();
        cache.insert("k".into(), "/v4/regions", Bytes::from_static(b"1"));

        cache.set_enabled(false);
        assert!(cache.get("k").is_none());
        cache.insert("other".into(), "/v4/kernels", Bytes::from_static(b"2"));
        assert_eq!(cache.len(), 1);

        cache.set_enabled(true);
        assert_eq!(cache.get("k"), Some(Bytes::from_static(b"1")));
    }

    #[test]
    fn test_zero_expiration_expires_immediately() {
        let cache = ResponseCache::default();
        cache.insert("k".into(), "/v4/regions", Bytes::from_static(b"1"));
        cache.set_expiration(Duration::ZERO);
        assert!(cache.get("k").is_none());

        // The expired lookup dropped it.
        cache.set_expiration(DEFAULT_CACHE_EXPIRATION);
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("k".into(), "/v4/regions", Bytes::from_static(b"1"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("k").is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_sweeps_expired_entries() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        for page in 1..=3 {
            cache.insert(format!("page{page}"), "/v4/regions", Bytes::new());
        }
        assert_eq!(cache.len(), 3);

        tokio::time::advance(Duration::from_secs(30)).await;
        cache.insert("fresh".into(), "/v4/kernels", Bytes::new());
        assert_eq!(cache.len(), 4);

        tokio::time::advance(Duration::from_secs(31)).await;
        cache.insert("newest".into(), "/v4/kernels", Bytes::new());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("fresh").is_some());
        assert!(cache.get("page1").is_none());
    }

    #[test]
    fn test_invalidate_endpoint() {
        let cache = ResponseCache::default();
        cache.insert("a".into(), "/v4/regions", Bytes::new());
        cache.insert("b".into(), "/v4/linode/kernels", Bytes::new());
        cache.insert("c".into(), "/v4/xregions", Bytes::new());

        assert_eq!(cache.invalidate_endpoint("regions"), 1);
        assert!(cache.get("a").is_none());
        assert!(cache.get("c").is_some());

        assert_eq!(cache.invalidate_endpoint("/linode/kernels/"), 1);
        assert_eq!(cache.len(), 1);
    }
}
