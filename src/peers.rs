//! Peer selection and peer fetch abstractions
//!
//! Two capability traits hide local-vs-remote retrieval from the group
//! layer. A picker decides which node owns a key; a getter fetches a value
//! from one remote node. The HTTP pool implements both; tests substitute
//! in-process fakes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Chooses the peer that owns a key.
pub trait PeerPicker: Send + Sync {
    /// Resolve the owner of `key`.
    ///
    /// Returns `None` when the key should be handled locally, either
    /// because this node owns it or because no peers are registered.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

/// Fetches a value for a group/key pair from one remote peer.
#[async_trait]
pub trait PeerGetter: Send + Sync {
    /// Fetch the value bytes for `key` in the named group.
    ///
    /// Connection errors, non-success statuses, and truncated bodies are
    /// all reported as [`Error::PeerTransport`](crate::Error::PeerTransport).
    async fn get(&self, group: &str, key: &str) -> Result<Vec<u8>>;
}
