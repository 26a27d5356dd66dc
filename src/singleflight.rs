//! Per-key coalescing of duplicate in-flight calls
//!
//! During a cache miss, every concurrent request for the same key on this
//! node would otherwise hit the peer or the backing loader independently.
//! [`SingleFlight`] guarantees at most one execution per key at a time: the
//! first caller becomes the leader and runs the work, later callers join
//! the in-flight record and receive a clone of whatever the leader
//! publishes, success or failure.
//!
//! The record index is guarded by a mutex held only for the O(1) record
//! operations, never across the work itself. The record is retired
//! immediately after the result is published, so a caller arriving after
//! completion starts a fresh call. If a leader is cancelled before
//! publishing, its record is dropped and the joined callers contend to
//! lead a retry, so a key can never wedge.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::broadcast;

type CallIndex<T> = Mutex<HashMap<String, broadcast::Sender<T>>>;

/// Coalesces concurrent calls for the same key into a single execution.
pub struct SingleFlight<T> {
    calls: CallIndex<T>,
}

/// What a caller became after consulting the call index
enum Role<T> {
    Leader(broadcast::Sender<T>),
    Follower(broadcast::Receiver<T>),
}

/// Removes the call record when the leader finishes or is cancelled
struct RecordGuard<'a, T> {
    calls: &'a CallIndex<T>,
    key: &'a str,
}

impl<T> Drop for RecordGuard<'_, T> {
    fn drop(&mut self) {
        self.calls.lock().remove(self.key);
    }
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + 'static,
{
    /// Create an empty coalescer
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key`, or join an in-flight call for the same key.
    ///
    /// All callers joined to one execution observe the same value. `work`
    /// runs with no internal lock held and may suspend arbitrarily.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        loop {
            let role = {
                let mut calls = self.calls.lock();
                match calls.get(key) {
                    Some(tx) => Role::Follower(tx.subscribe()),
                    None => {
                        let (tx, _) = broadcast::channel(1);
                        calls.insert(key.to_string(), tx.clone());
                        Role::Leader(tx)
                    }
                }
            };

            match role {
                Role::Leader(tx) => {
                    let record = RecordGuard {
                        calls: &self.calls,
                        key,
                    };
                    let value = work().await;
                    let _ = tx.send(value.clone());
                    // Retire the record only after publishing; the entry
                    // must stay in the index while the work runs so no
                    // second leader can start for this key. A subscriber
                    // that raced in after the send observes a closed
                    // channel and retries fresh.
                    drop(record);
                    return value;
                }
                Role::Follower(mut rx) => match rx.recv().await {
                    Ok(value) => return value,
                    // The leader went away without publishing; contend to
                    // lead the retry
                    Err(_) => continue,
                },
            }
        }
    }

    /// Number of keys currently in flight
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}
