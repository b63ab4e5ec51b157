//! Query embedding cache.
//!
//! Repeated chat and search queries skip the embedder. Entries expire after a
//! TTL and the cache holds at most `capacity` texts (least recently used
//! evicted first). The wrapper reports the inner embedder's version, so cached
//! vectors are interchangeable with fresh ones.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lru::LruCache;

use super::embedder::Embedder;
use crate::core::error::Result;

#[derive(Debug, Clone)]
struct CachedVector {
    vector: Vec<f32>,
    cached_at: Instant,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// TTL + LRU cache around any embedder
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Mutex<LruCache<String, CachedVector>>,
    stats: Mutex<CacheStats>,
    ttl: Duration,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            stats: Mutex::new(CacheStats::default()),
            ttl,
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    fn lookup(&self, text: &str) -> Option<Vec<f32>> {
        let mut cache = self.cache.lock().ok()?;
        let fresh = cache
            .get(text)
            .filter(|entry| entry.cached_at.elapsed() < self.ttl)
            .map(|entry| entry.vector.clone());
        if fresh.is_none() {
            cache.pop(text);
        }
        drop(cache);

        if let Ok(mut stats) = self.stats.lock() {
            if fresh.is_some() {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
        }
        fresh
    }

    fn store(&self, text: &str, vector: &[f32]) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                text.to_string(),
                CachedVector {
                    vector: vector.to_vec(),
                    cached_at: Instant::now(),
                },
            );
        }
    }
}

impl Embedder for CachedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.lookup(text) {
            tracing::debug!("query embedding cache hit");
            return Ok(vector);
        }
        let vector = self.inner.embed(text)?;
        self.store(text, &vector);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn version(&self) -> &str {
        self.inner.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::embedder::HtpEmbedder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn version(&self) -> &str {
            "counting-v1"
        }
    }

    fn counting() -> Arc<CountingEmbedder> {
        Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_cache_hit_skips_inner() {
        let inner = counting();
        let cached = CachedEmbedder::new(inner.clone(), 10, Duration::from_secs(300));

        let a = cached.embed("rust jobs").unwrap();
        let b = cached.embed("rust jobs").unwrap();
        assert_eq!(a, b);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        let stats = cached.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_expired_entry_recomputed() {
        let inner = counting();
        let cached = CachedEmbedder::new(inner.clone(), 10, Duration::ZERO);

        cached.embed("q").unwrap();
        cached.embed("q").unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let inner = counting();
        let cached = CachedEmbedder::new(inner.clone(), 2, Duration::from_secs(300));

        cached.embed("a").unwrap();
        cached.embed("b").unwrap();
        cached.embed("c").unwrap();
        cached.embed("a").unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_version_passthrough() {
        let cached = CachedEmbedder::new(Arc::new(HtpEmbedder::new()), 4, Duration::from_secs(1));
        assert_eq!(cached.version(), "htp-384-v1");
        assert_eq!(cached.dimension(), 384);
    }
}
