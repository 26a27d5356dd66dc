//! HTTP transport between cache peers
//!
//! Peers speak plain HTTP: `GET {peer}{base_path}{group}/{key}` returns the
//! raw value bytes with a 200, a 400 for an unknown group or malformed
//! path, and a 500 for loader failures. Both halves live here:
//!
//! - [`HttpPool`] serves this node's keys and, as a
//!   [`PeerPicker`](crate::peers::PeerPicker), routes outgoing lookups via
//!   the consistent-hash ring.
//! - [`HttpGetter`] is the client half, one per known peer.
//!
//! The base path and replica count are fleet-wide constants; nodes that
//! disagree on either will route keys inconsistently.

mod client;
pub use client::HttpGetter;

mod pool;
pub use pool::HttpPool;

/// Default URL prefix for inter-node traffic
pub const DEFAULT_BASE_PATH: &str = "/_dawncache/";

/// Default virtual replicas per peer on the ring
pub const DEFAULT_REPLICAS: usize = 50;
