//! Response cache storage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::body::Bytes;
use dashmap::DashMap;
use serde::Serialize;

use crate::observability::metrics;

/// A stored upstream response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub expires_at: Instant,
}

impl CachedResponse {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total: u64,
    pub hit_ratio: f64,
    pub entries: usize,
}

/// Every this many puts, expired entries are swept from the whole map.
const PRUNE_EVERY: u64 = 256;

/// A thread-safe response cache.
///
/// Expired entries are dropped when read, and swept in bulk every
/// `PRUNE_EVERY` puts so signatures that are never read again do not pile up.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CachedResponse>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
}

impl ResponseCache {
    /// Create an empty cache applying `ttl` to every entry.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            puts: AtomicU64::new(0),
        }
    }

    /// Look up a fresh entry. Expired entries count as a miss and are dropped.
    pub fn get(&self, signature: &str) -> Option<CachedResponse> {
        self.get_at(signature, Instant::now())
    }

    fn get_at(&self, signature: &str, now: Instant) -> Option<CachedResponse> {
        let found = self
            .entries
            .get(signature)
            .map(|entry| entry.value().clone());

        match found {
            Some(entry) if entry.is_fresh(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_hit();
                Some(entry)
            }
            Some(_) => {
                // Only remove if no fresher put raced in since the read.
                self.entries.remove_if(signature, |_, e| !e.is_fresh(now));
                self.record_miss();
                None
            }
            None => {
                self.record_miss();
                None
            }
        }
    }

    /// Store a response under the cache TTL. Overwrites unconditionally.
    pub fn put(&self, signature: impl Into<String>, body: Bytes, content_type: Option<String>) {
        self.put_at(signature.into(), body, content_type, self.ttl, Instant::now());
    }

    fn put_at(&self, signature: String, body: Bytes, content_type: Option<String>, ttl: Duration, now: Instant) {
        let entry = CachedResponse {
            body,
            content_type,
            expires_at: now + ttl,
        };
        self.entries.insert(signature, entry);

        if (self.puts.fetch_add(1, Ordering::Relaxed) + 1) % PRUNE_EVERY == 0 {
            self.prune_at(now);
        }
    }

    /// Drop every entry that has expired by `now`.
    fn prune_at(&self, now: Instant) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "Pruned expired cache entries");
        }
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_ratio = if total > 0 {
            ((hits as f64 / total as f64) * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            total,
            hit_ratio,
            entries: self.entries.len(),
        }
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_miss();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_cache_operations() {
        let cache = ResponseCache::new(Duration::from_secs(60));

        assert!(cache.get("GET /a").is_none());

        cache.put("GET /a", Bytes::from_static(b"[1,2]"), Some("application/json".into()));
        let hit = cache.get("GET /a").unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"[1,2]"));
        assert_eq!(hit.content_type.as_deref(), Some("application/json"));

        // Overwrite wins
        cache.put("GET /a", Bytes::from_static(b"[3]"), None);
        assert_eq!(cache.get("GET /a").unwrap().body, Bytes::from_static(b"[3]"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.hit_ratio, 66.67);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_lazy_expiry() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let now = Instant::now();
        cache.put_at("GET /b".into(), Bytes::from_static(b"x"), None, Duration::from_secs(5), now);

        assert!(cache.get_at("GET /b", now).is_some());
        assert_eq!(cache.len(), 1);

        assert!(cache.get_at("GET /b", now + Duration::from_secs(6)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unread_expired_entries_are_swept() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let start = Instant::now();
        let short = Duration::from_millis(10);

        for n in 0..PRUNE_EVERY - 1 {
            cache.put_at(format!("GET /list?n={}", n), Bytes::from_static(b"x"), None, short, start);
        }
        assert_eq!(cache.len() as u64, PRUNE_EVERY - 1);

        // The next put lands after every earlier entry expired and triggers a sweep.
        let later = start + Duration::from_secs(1);
        cache.put_at("GET /list?n=last".into(), Bytes::from_static(b"y"), None, short, later);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("GET /list?n=last", later).is_some());
    }

    #[test]
    fn test_sweep_keeps_fresh_entries() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let start = Instant::now();

        cache.put_at("GET /keep".into(), Bytes::from_static(b"k"), None, Duration::from_secs(60), start);
        for n in 1..PRUNE_EVERY {
            cache.put_at(format!("GET /gone?n={}", n), Bytes::from_static(b"x"), None, Duration::from_secs(1), start);
        }
        // Sweep ran at put number PRUNE_EVERY, before anything expired
        assert_eq!(cache.len() as u64, PRUNE_EVERY);

        let later = start + Duration::from_secs(5);
        for n in 0..PRUNE_EVERY {
            cache.put_at(format!("GET /late?n={}", n), Bytes::from_static(b"z"), None, Duration::from_secs(60), later);
        }
        assert_eq!(cache.len() as u64, PRUNE_EVERY + 1);
        assert!(cache.get_at("GET /keep", later).is_some());
    }

    #[test]
    fn test_overwrite_resets_expiry() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.put_at("GET /c".into(), Bytes::from_static(b"old"), None, Duration::from_secs(5), Instant::now());
        cache.put("GET /c", Bytes::from_static(b"new"), None);

        let later = Instant::now() + Duration::from_secs(30);
        let hit = cache.get_at("GET /c", later).unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"new"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_writers_same_signature() {
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        cache.put("GET /d", Bytes::from(format!("body-{}", i)), None);
                        let _ = cache.get("GET /d");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let body = cache.get("GET /d").unwrap().body;
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.starts_with("body-"));
        assert_eq!(cache.len(), 1);
    }
}
