//! Thread-safe shell around the LRU core

use parking_lot::Mutex;

use crate::cache::lru::LruCache;
use crate::types::ByteView;

/// Mutex-guarded LRU holding a group's resident values.
///
/// The inner LRU is constructed lazily on the first `add`, so a cache that
/// never sees a value allocates nothing and answers `get` with a miss. One
/// mutex covers both paths because a lookup reorders the recency list.
/// Callers must not hold the lock across I/O; both methods release it before
/// returning.
pub struct ConcurrentCache {
    max_bytes: u64,
    inner: Mutex<Option<LruCache<ByteView>>>,
}

impl ConcurrentCache {
    /// Create a shell with the given byte budget (0 = unbounded)
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            inner: Mutex::new(None),
        }
    }

    /// Insert a value, constructing the LRU on first use
    pub fn add(&self, key: &str, value: ByteView) {
        let mut inner = self.inner.lock();
        inner
            .get_or_insert_with(|| LruCache::new(self.max_bytes))
            .add(key, value);
    }

    /// Look up a value, promoting it on a hit
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let mut inner = self.inner.lock();
        inner.as_mut()?.get(key).cloned()
    }

    /// Number of resident entries
    pub fn len(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, LruCache::len)
    }

    /// Whether no entries are resident
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently charged against the budget
    pub fn used_bytes(&self) -> u64 {
        self.inner.lock().as_ref().map_or(0, LruCache::used_bytes)
    }
}
