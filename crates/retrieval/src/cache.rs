use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::store::VectorChunk;

#[derive(Clone)]
struct CachedQuery {
    results: Vec<(VectorChunk, f32)>,
    cached_at: Instant,
}

/// Optional query-result cache keyed on `(query_text, provider_id)`, with a
/// TTL so stale results age out without an explicit invalidation path.
/// Capacity is fixed at construction; eviction beyond TTL is checked lazily
/// on lookup.
pub struct RetrievalCache {
    entries: LruCache<(String, String), CachedQuery>,
    ttl: Duration,
}

impl RetrievalCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self { entries: LruCache::new(capacity), ttl }
    }

    pub fn get(&mut self, query_text: &str, provider_id: &str) -> Option<Vec<(VectorChunk, f32)>> {
        let key = (query_text.to_string(), provider_id.to_string());
        match self.entries.get(&key) {
            Some(cached) if cached.cached_at.elapsed() <= self.ttl => Some(cached.results.clone()),
            Some(_) => {
                self.entries.pop(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&mut self, query_text: &str, provider_id: &str, results: Vec<(VectorChunk, f32)>) {
        let key = (query_text.to_string(), provider_id.to_string());
        self.entries.put(key, CachedQuery { results, cached_at: Instant::now() });
    }
}
