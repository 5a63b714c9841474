//! Result set caching with LRU eviction

use crate::query::Query;
use crate::search::ResultSet;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Executed queries keyed by their parsed form. Result sets are immutable, so
/// a hit can be shared with every consumer that asks again.
pub struct ResultCache {
    cache: Mutex<LruCache<Query, Arc<ResultSet>>>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<Query, Arc<ResultSet>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, query: &Query) -> Option<Arc<ResultSet>> {
        self.lock().get(query).map(Arc::clone)
    }

    pub fn put(&self, query: Query, results: Arc<ResultSet>) {
        self.lock().put(query, results);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// `(entries, capacity)`
    pub fn stats(&self) -> (usize, usize) {
        let cache = self.lock();
        (cache.len(), cache.cap().get())
    }
}
