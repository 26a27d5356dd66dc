//! DawnCache: a distributed in-memory key-value cache
//!
//! A federation of peer nodes shares one logical cache. Each named
//! namespace ("group") binds a bounded, byte-weighted LRU to an
//! embedder-supplied loader; a consistent-hash ring assigns every key a
//! single owning node, and misses for the same key are coalesced so the
//! backing source of truth sees at most one concurrent load per key per
//! node.
//!
//! # Lookup path
//!
//! ```text
//! Group::get(key)
//!   ├── local cache hit ───────────────────────────► ByteView
//!   └── miss ──► single-flight
//!                  ├── remote peer owns key ──► HTTP fetch from owner
//!                  └── owned locally ──► loader ──► populate cache
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use dawncache::{new_group, FnLoader, BoxError};
//!
//! # async fn example() -> dawncache::Result<()> {
//! let group = new_group(
//!     "scores",
//!     64 * 1024 * 1024,
//!     FnLoader(|key: String| async move {
//!         // consult the source of truth
//!         Ok::<Vec<u8>, BoxError>(key.into_bytes())
//!     }),
//! );
//!
//! let value = group.get("tom").await?;
//! println!("tom = {value}");
//! # Ok(())
//! # }
//! ```
//!
//! Multi-node operation wires an [`HttpPool`] into the group with
//! [`Group::register_peers`]; see the server binary for a full node.

pub mod cache;
pub mod error;
pub mod group;
pub mod http;
pub mod peers;
pub mod ring;
pub mod singleflight;
pub mod types;

pub use error::{Error, Result};
pub use group::{get_group, groups, new_group, BoxError, FnLoader, Group, Loader, StatsSnapshot};
pub use http::{HttpGetter, HttpPool, DEFAULT_BASE_PATH, DEFAULT_REPLICAS};
pub use peers::{PeerGetter, PeerPicker};
pub use ring::{HashFn, HashRing};
pub use singleflight::SingleFlight;
pub use types::ByteView;
