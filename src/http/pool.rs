//! HTTP peer pool: inter-node endpoint and ring-backed peer selection

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::Path;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;

use crate::error::Error;
use crate::group::get_group;
use crate::http::client::HttpGetter;
use crate::http::{DEFAULT_BASE_PATH, DEFAULT_REPLICAS};
use crate::peers::{PeerGetter, PeerPicker};
use crate::ring::HashRing;

/// One node's view of the peer fleet.
///
/// The pool plays both sides of the wire: [`router`](HttpPool::router)
/// serves this node's values to other peers, and the [`PeerPicker`] impl
/// routes outgoing lookups to whichever peer the consistent-hash ring says
/// owns the key. The ring and the per-peer getters are replaced together
/// under one mutex, so a picker never observes a torn peer set.
pub struct HttpPool {
    self_url: String,
    base_path: String,
    replicas: usize,
    state: Mutex<PoolState>,
}

struct PoolState {
    ring: HashRing,
    getters: HashMap<String, Arc<HttpGetter>>,
}

impl HttpPool {
    /// Create a pool identifying this node as `self_url`
    /// (e.g. `http://10.0.0.1:8001`)
    pub fn new(self_url: impl Into<String>) -> Self {
        Self {
            self_url: self_url.into(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            state: Mutex::new(PoolState {
                ring: HashRing::new(DEFAULT_REPLICAS),
                getters: HashMap::new(),
            }),
        }
    }

    /// Override the inter-node URL prefix (must match across the fleet)
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Override the virtual replica count (must match across the fleet)
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// The URL this node advertises to its peers
    pub fn self_url(&self) -> &str {
        &self.self_url
    }

    /// Replace the peer set.
    ///
    /// Rebuilds the ring and one HTTP getter per peer. The list should
    /// include this node's own URL so the ring assigns it a share of keys.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let client = reqwest::Client::new();
        let mut ring = HashRing::new(self.replicas);
        let mut getters = HashMap::new();
        for peer in peers {
            let peer = peer.as_ref();
            ring.add([peer]);
            getters.insert(
                peer.to_string(),
                Arc::new(HttpGetter::with_client(
                    client.clone(),
                    format!("{peer}{}", self.base_path),
                )),
            );
        }
        tracing::info!(node = %self.self_url, peers = getters.len(), "peer set updated");

        let mut state = self.state.lock();
        state.ring = ring;
        state.getters = getters;
    }

    /// Build the router serving this node's share of the keyspace.
    ///
    /// Handles `GET {base_path}{group}/{key}`; anything else is a 400.
    pub fn router(&self) -> Router {
        let path = format!("{}{{group}}/{{*key}}", self.base_path);
        Router::new()
            .route(&path, get(serve_group_value))
            .fallback(unexpected_path)
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.lock();
        let owner = state.ring.owner(key)?;
        if owner == self.self_url {
            return None;
        }
        tracing::debug!(node = %self.self_url, peer = owner, key, "picked peer");
        state
            .getters
            .get(owner)
            .map(|getter| Arc::clone(getter) as Arc<dyn PeerGetter>)
    }
}

/// Serve one value to a requesting peer
async fn serve_group_value(Path((group_name, key)): Path<(String, String)>) -> Response {
    tracing::debug!(group = %group_name, key = %key, "peer request");

    let Some(group) = get_group(&group_name) else {
        let err = Error::NoSuchGroup(group_name);
        return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
    };

    match group.get(&key).await {
        Ok(view) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            view.to_vec(),
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn unexpected_path(uri: Uri) -> Response {
    (
        StatusCode::BAD_REQUEST,
        format!("unexpected path: {}", uri.path()),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_peer_without_peers_is_local() {
        let pool = HttpPool::new("http://127.0.0.1:9001");
        assert!(pool.pick_peer("any-key").is_none());
    }

    #[test]
    fn test_pick_peer_never_returns_self() {
        let pool = HttpPool::new("http://127.0.0.1:9001");
        pool.set_peers(["http://127.0.0.1:9001"]);
        for i in 0..100 {
            assert!(pool.pick_peer(&format!("key-{i}")).is_none());
        }
    }

    #[test]
    fn test_pick_peer_follows_ring_ownership() {
        let this = "http://127.0.0.1:9001";
        let other = "http://127.0.0.1:9002";
        let pool = HttpPool::new(this);
        pool.set_peers([this, other]);

        // Mirror of the pool's internal ring, for expected ownership
        let mut reference = HashRing::new(DEFAULT_REPLICAS);
        reference.add([this, other]);

        let mut remote = 0;
        for i in 0..200 {
            let key = format!("key-{i}");
            let picked = pool.pick_peer(&key);
            let expected_remote = reference.owner(&key) == Some(other);
            assert_eq!(picked.is_some(), expected_remote);
            if picked.is_some() {
                remote += 1;
            }
        }
        // Two peers on a 50-replica ring both own a meaningful share
        assert!(remote > 0 && remote < 200);
    }
}
