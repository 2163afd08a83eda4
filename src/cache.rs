use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Time-bounded cache for fully rendered pages.
///
/// A stored body is served unchanged until the TTL elapses or the cache
/// is cleared; within the window the page may be stale with respect to
/// the database.
pub struct PageCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

struct CacheEntry {
    stored_at: Instant,
    body: String,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().expect("page cache lock poisoned")
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries();
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.body.clone())
    }

    pub fn put(&self, key: impl Into<String>, body: String) {
        self.entries().insert(
            key.into(),
            CacheEntry {
                stored_at: Instant::now(),
                body,
            },
        );
    }

    pub fn clear(&self) {
        self.entries().clear();
    }
}
