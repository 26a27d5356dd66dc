//! Error types for the cache

use thiserror::Error;

/// Main error type for the cache.
///
/// Variants carry string payloads so the error can be cloned and shared
/// with every caller coalesced onto the same in-flight load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An empty key was supplied to a group lookup
    #[error("key must not be empty")]
    EmptyKey,

    /// Lookup of an unregistered group namespace
    #[error("no such group: {0}")]
    NoSuchGroup(String),

    /// The user-supplied loader failed for a key
    #[error("loader failed for key {key:?}: {reason}")]
    Loader { key: String, reason: String },

    /// A peer fetch failed: connection error, non-200 status, or a
    /// truncated body
    #[error("peer fetch failed: {0}")]
    PeerTransport(String),
}

impl Error {
    /// Build a loader failure from any error source
    pub fn loader(key: &str, source: impl std::fmt::Display) -> Self {
        Error::Loader {
            key: key.to_string(),
            reason: source.to_string(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
