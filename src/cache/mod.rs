//! Local cache storage for group values
//!
//! Two layers, split the same way their locking is split:
//!
//! - **LRU core** (`lru.rs`): byte-weighted, recency-ordered map with an
//!   optional eviction hook. Single-threaded on purpose.
//! - **Concurrent shell** (`concurrent.rs`): a mutex wrapper that constructs
//!   the LRU lazily and serializes every access, since even lookups rewrite
//!   the recency order.
//!
//! Each group owns one [`ConcurrentCache`] for the values it loaded locally.

mod lru;
pub use lru::{EvictionHook, LruCache, Weighted};

mod concurrent;
pub use concurrent::ConcurrentCache;
