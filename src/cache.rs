// Memoizing result cache
//
// Entries are keyed by the SHA-256 of URL + mode. Concurrent callers for the
// same key share one in-flight computation. Only successes are kept; they
// expire after a TTL, and the oldest are evicted past the capacity.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::debug;

/// Cache key for a URL fetched in a given mode
pub fn cache_key(url: &str, mode: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(mode.as_bytes());
    hex::encode(hasher.finalize())
}

struct Entry<V> {
    cell: Arc<OnceCell<Arc<V>>>,
    /// Set once the value is ready
    ready_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn pending() -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
            ready_at: None,
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.ready_at.is_some_and(|at| at.elapsed() >= ttl)
    }

    /// Pending, and no caller is working on it (its init failed or was cancelled)
    fn is_abandoned(&self) -> bool {
        self.ready_at.is_none() && !self.cell.initialized() && Arc::strong_count(&self.cell) == 1
    }
}

pub struct ResultCache<V> {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V> ResultCache<V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Ready, unexpired value for `key`
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        if entry.is_expired(self.ttl) {
            return None;
        }
        entry.cell.get().cloned()
    }

    /// Number of ready entries
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|e| e.ready_at.is_some())
            .count()
    }

    /// Cached value for `key`, or the result of `init`.
    ///
    /// A failed `init` stores nothing; a caller already waiting on the same
    /// key runs its own `init` and its result is kept.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, init: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = {
            let mut entries = self.entries.lock();
            if entries
                .get(key)
                .is_some_and(|e| e.is_expired(self.ttl) || e.is_abandoned())
            {
                debug!(key, "dropping stale cache entry");
                entries.remove(key);
            }
            entries
                .entry(key.to_string())
                .or_insert_with(Entry::pending)
                .cell
                .clone()
        };

        if let Some(value) = cell.get() {
            debug!(key, "cache hit");
            return Ok(value.clone());
        }

        let result = cell
            .get_or_try_init(|| async { init().await.map(Arc::new) })
            .await
            .cloned();

        let mut entries = self.entries.lock();
        let same_cell = entries
            .get(key)
            .is_some_and(|e| Arc::ptr_eq(&e.cell, &cell));

        match &result {
            Ok(_) if same_cell => {
                if let Some(entry) = entries.get_mut(key) {
                    entry.ready_at.get_or_insert_with(Instant::now);
                }
                self.evict_oldest(&mut entries);
            }
            // other holders are waiters that will retry on this cell
            Err(_) if same_cell && !cell.initialized() && Arc::strong_count(&cell) == 2 => {
                entries.remove(key);
            }
            _ => {}
        }

        result
    }

    fn evict_oldest(&self, entries: &mut HashMap<String, Entry<V>>) {
        entries.retain(|_, e| !e.is_abandoned());

        loop {
            let ready = entries.values().filter(|e| e.ready_at.is_some()).count();
            if ready <= self.capacity {
                return;
            }

            let oldest = entries
                .iter()
                .filter_map(|(k, e)| e.ready_at.map(|at| (k.clone(), at)))
                .min_by_key(|(_, at)| *at)
                .map(|(k, _)| k);

            match oldest {
                Some(key) => {
                    debug!(key = %key, "cache eviction");
                    entries.remove(&key);
                }
                None => return,
            }
        }
    }
}
