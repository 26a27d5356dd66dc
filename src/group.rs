//! Group namespaces and the load pipeline
//!
//! A [`Group`] is a named cache bound to a loader. `Group::get` consults the
//! local cache, then an owning peer, then the loader, in that order:
//!
//! ```text
//! get(key) ──► local cache ──miss──► single-flight ──► peer owns key? ──► peer fetch
//!                                          │
//!                                          └──► local loader ──► populate cache
//! ```
//!
//! Groups live in a process-wide registry so the HTTP transport can resolve
//! a namespace by name. Writers are exclusive, lookups are shared.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;

use crate::cache::ConcurrentCache;
use crate::error::{Error, Result};
use crate::peers::{PeerGetter, PeerPicker};
use crate::singleflight::SingleFlight;
use crate::types::ByteView;

/// Error type loaders are free to return
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Produces the authoritative value for a key on a cache miss.
///
/// The loader is the embedder's bridge to the source of truth (a database,
/// a file, a downstream service). It should be idempotent per key: the
/// cache memoizes whichever successful result arrived first.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Compute the value bytes for `key`
    async fn load(&self, key: &str) -> std::result::Result<Vec<u8>, BoxError>;
}

/// Adapter letting an async closure serve as a [`Loader`]
pub struct FnLoader<F>(pub F);

#[async_trait]
impl<F, Fut> Loader for FnLoader<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<Vec<u8>, BoxError>> + Send,
{
    async fn load(&self, key: &str) -> std::result::Result<Vec<u8>, BoxError> {
        (self.0)(key.to_string()).await
    }
}

/// Counters for one group, updated with relaxed atomics on the hot path
#[derive(Default)]
struct GroupStats {
    gets: AtomicU64,
    cache_hits: AtomicU64,
    peer_loads: AtomicU64,
    local_loads: AtomicU64,
    load_errors: AtomicU64,
}

/// Point-in-time copy of a group's counters
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub gets: u64,
    pub cache_hits: u64,
    pub peer_loads: u64,
    pub local_loads: u64,
    pub load_errors: u64,
    pub resident_entries: usize,
    pub resident_bytes: u64,
}

/// A named cache namespace bound to a loader.
pub struct Group {
    name: String,
    loader: Arc<dyn Loader>,
    main_cache: ConcurrentCache,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    flight: SingleFlight<Result<ByteView>>,
    stats: GroupStats,
}

impl Group {
    /// The group's registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register the peer picker for this group.
    ///
    /// # Panics
    ///
    /// Panics when called a second time; wiring peers twice is a startup
    /// bug, not a runtime condition.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        if self.peers.set(picker).is_err() {
            panic!("register_peers called more than once for group {}", self.name);
        }
    }

    /// Fetch the value for `key`.
    ///
    /// Served from the local cache when resident; otherwise loaded from the
    /// owning peer or the loader, with concurrent misses for the same key
    /// coalesced into one underlying call.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        self.stats.gets.fetch_add(1, Ordering::Relaxed);

        if let Some(view) = self.main_cache.get(key) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(group = %self.name, key, "cache hit");
            return Ok(view);
        }

        self.flight.run(key, || self.load(key)).await
    }

    /// Resolve a miss: remote owner first, local loader otherwise.
    ///
    /// Runs at most once per key at a time under the single-flight record.
    async fn load(&self, key: &str) -> Result<ByteView> {
        let result = match self.peers.get().and_then(|picker| picker.pick_peer(key)) {
            Some(peer) => self.load_from_peer(peer.as_ref(), key).await,
            None => self.load_locally(key).await,
        };
        if result.is_err() {
            self.stats.load_errors.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    async fn load_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<ByteView> {
        // Failures surface to the caller. The key is not owned here, and a
        // loader fallback could stampede the source of truth.
        let bytes = peer.get(&self.name, key).await?;
        self.stats.peer_loads.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(group = %self.name, key, len = bytes.len(), "loaded from peer");
        // Peer-owned entries are not cached locally: one owner per key.
        Ok(ByteView::from(bytes))
    }

    async fn load_locally(&self, key: &str) -> Result<ByteView> {
        let bytes = self
            .loader
            .load(key)
            .await
            .map_err(|source| Error::loader(key, source))?;
        let view = ByteView::from(bytes);
        self.main_cache.add(key, view.clone());
        self.stats.local_loads.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(group = %self.name, key, len = view.len(), "loaded locally");
        Ok(view)
    }

    /// Snapshot the group's counters and cache occupancy
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            gets: self.stats.gets.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            peer_loads: self.stats.peer_loads.load(Ordering::Relaxed),
            local_loads: self.stats.local_loads.load(Ordering::Relaxed),
            load_errors: self.stats.load_errors.load(Ordering::Relaxed),
            resident_entries: self.main_cache.len(),
            resident_bytes: self.main_cache.used_bytes(),
        }
    }
}

type Registry = RwLock<HashMap<String, Arc<Group>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Create a group and register it under `name`.
///
/// Registering a name twice replaces the earlier binding; embedders should
/// treat names as singleton identifiers.
pub fn new_group(name: &str, cache_bytes: u64, loader: impl Loader + 'static) -> Arc<Group> {
    let group = Arc::new(Group {
        name: name.to_string(),
        loader: Arc::new(loader),
        main_cache: ConcurrentCache::new(cache_bytes),
        peers: OnceLock::new(),
        flight: SingleFlight::new(),
        stats: GroupStats::default(),
    });
    registry().write().insert(name.to_string(), Arc::clone(&group));
    tracing::info!(group = name, cache_bytes, "group registered");
    group
}

/// Look up a registered group by name
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    registry().read().get(name).cloned()
}

/// All currently registered groups
pub fn groups() -> Vec<Arc<Group>> {
    registry().read().values().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Loader over a fixed table, counting every invocation
    struct TableLoader {
        hits: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Loader for TableLoader {
        async fn load(&self, key: &str) -> std::result::Result<Vec<u8>, BoxError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            match key {
                "tom" => Ok(b"TOM".to_vec()),
                "jerry" => Ok(b"JERRY".to_vec()),
                _ => Err(format!("{key} not in table").into()),
            }
        }
    }

    fn counting_loader(hits: Arc<AtomicUsize>) -> TableLoader {
        TableLoader { hits }
    }

    struct FakeGetter {
        reply: Result<Vec<u8>>,
    }

    #[async_trait]
    impl PeerGetter for FakeGetter {
        async fn get(&self, _group: &str, _key: &str) -> Result<Vec<u8>> {
            self.reply.clone()
        }
    }

    struct FakePicker {
        getter: Arc<FakeGetter>,
    }

    impl PeerPicker for FakePicker {
        fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerGetter>> {
            Some(Arc::clone(&self.getter) as Arc<dyn PeerGetter>)
        }
    }

    #[tokio::test]
    async fn test_loader_invoked_once_per_cached_key() {
        let hits = Arc::new(AtomicUsize::new(0));
        let group = new_group("scores-memoized", 1 << 20, counting_loader(Arc::clone(&hits)));

        assert_eq!(group.get("tom").await.unwrap(), ByteView::from("TOM"));
        assert_eq!(group.get("tom").await.unwrap(), ByteView::from("TOM"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let stats = group.stats();
        assert_eq!(stats.gets, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.local_loads, 1);
    }

    #[tokio::test]
    async fn test_loader_errors_not_cached() {
        let hits = Arc::new(AtomicUsize::new(0));
        let group = new_group("scores-errors", 1 << 20, counting_loader(Arc::clone(&hits)));

        for _ in 0..2 {
            let err = group.get("unknown").await.unwrap_err();
            assert!(matches!(err, Error::Loader { .. }));
        }
        // The failure was not memoized; each get re-invoked the loader
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(group.stats().load_errors, 2);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let hits = Arc::new(AtomicUsize::new(0));
        let group = new_group("scores-empty", 1 << 20, counting_loader(Arc::clone(&hits)));

        assert_eq!(group.get("").await.unwrap_err(), Error::EmptyKey);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_registry_lookup_and_replacement() {
        let hits = Arc::new(AtomicUsize::new(0));
        let first = new_group("scores-registry", 1 << 20, counting_loader(Arc::clone(&hits)));
        let found = get_group("scores-registry").unwrap();
        assert!(Arc::ptr_eq(&first, &found));
        assert!(get_group("absent-registry").is_none());

        let second = new_group("scores-registry", 1 << 20, counting_loader(hits));
        let found = get_group("scores-registry").unwrap();
        assert!(Arc::ptr_eq(&second, &found));
        assert!(!Arc::ptr_eq(&first, &found));
    }

    #[tokio::test]
    async fn test_peer_fetch_skips_local_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let group = new_group("scores-peer", 1 << 20, counting_loader(Arc::clone(&hits)));
        group.register_peers(Arc::new(FakePicker {
            getter: Arc::new(FakeGetter {
                reply: Ok(b"REMOTE".to_vec()),
            }),
        }));

        assert_eq!(group.get("tom").await.unwrap(), ByteView::from("REMOTE"));
        // The loader never ran and the value was not memoized locally
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(group.main_cache.get("tom").is_none());

        let stats = group.stats();
        assert_eq!(stats.peer_loads, 1);
        assert_eq!(stats.local_loads, 0);
    }

    #[tokio::test]
    async fn test_peer_failure_surfaces_without_loader_fallback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let group = new_group("scores-peer-down", 1 << 20, counting_loader(Arc::clone(&hits)));
        group.register_peers(Arc::new(FakePicker {
            getter: Arc::new(FakeGetter {
                reply: Err(Error::PeerTransport("connection refused".to_string())),
            }),
        }));

        let err = group.get("tom").await.unwrap_err();
        assert!(matches!(err, Error::PeerTransport(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(group.stats().load_errors, 1);
    }

    #[tokio::test]
    async fn test_fn_loader_adapter() {
        let group = new_group(
            "scores-fn-loader",
            1 << 20,
            FnLoader(|key: String| async move {
                Ok::<Vec<u8>, BoxError>(key.to_uppercase().into_bytes())
            }),
        );
        assert_eq!(group.get("tom").await.unwrap(), ByteView::from("TOM"));
    }

    #[tokio::test]
    #[should_panic(expected = "register_peers called more than once")]
    async fn test_register_peers_twice_panics() {
        let hits = Arc::new(AtomicUsize::new(0));
        let group = new_group("scores-double-peers", 1 << 20, counting_loader(hits));
        let picker = || {
            Arc::new(FakePicker {
                getter: Arc::new(FakeGetter {
                    reply: Ok(Vec::new()),
                }),
            })
        };
        group.register_peers(picker());
        group.register_peers(picker());
    }
}
