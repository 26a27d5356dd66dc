//! Byte-weighted LRU cache core
//!
//! Single-threaded recency-ordered map used as the storage layer of every
//! group cache. Entries are charged by `key length + value weight`, and
//! eviction walks from the least-recently-used end until the configured
//! byte budget holds again.
//!
//! The recency list is a doubly-linked list threaded through a slot arena
//! (indices instead of pointers), with a `HashMap` from key to slot id for
//! O(1) lookup:
//!
//! ```text
//!   head ──► [MRU] ◄──► [..] ◄──► [LRU] ◄── tail
//! ```
//!
//! Not safe for concurrent use; see [`ConcurrentCache`](super::ConcurrentCache)
//! for the mutex shell that serializes access.

use std::collections::HashMap;

use crate::types::ByteView;

/// Sentinel slot id meaning "no link"
const NIL: usize = usize::MAX;

/// Types that can report their charged size in bytes
pub trait Weighted {
    /// Size of the value for cache accounting
    fn weight(&self) -> usize;
}

impl Weighted for ByteView {
    fn weight(&self) -> usize {
        self.len()
    }
}

/// Callback invoked with `(key, value)` for every evicted entry
pub type EvictionHook<V> = Box<dyn FnMut(&str, &V) + Send>;

struct Slot<V> {
    key: String,
    value: V,
    prev: usize,
    next: usize,
}

/// Bounded, byte-weighted, recency-ordered mapping from key to value.
///
/// A `max_bytes` of 0 disables the capacity bound.
pub struct LruCache<V> {
    max_bytes: u64,
    used_bytes: u64,
    slots: Vec<Option<Slot<V>>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: usize,
    tail: usize,
    on_evicted: Option<EvictionHook<V>>,
}

impl<V: Weighted> LruCache<V> {
    /// Create an empty cache with the given byte budget (0 = unbounded)
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            used_bytes: 0,
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: NIL,
            tail: NIL,
            on_evicted: None,
        }
    }

    /// Create an empty cache that reports evicted entries to `hook`
    pub fn with_eviction_hook(
        max_bytes: u64,
        hook: impl FnMut(&str, &V) + Send + 'static,
    ) -> Self {
        let mut cache = Self::new(max_bytes);
        cache.on_evicted = Some(Box::new(hook));
        cache
    }

    /// Look up a key, promoting the entry to most-recently-used on a hit
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.detach(id);
        self.attach_front(id);
        self.slots[id].as_ref().map(|slot| &slot.value)
    }

    /// Insert a value or update it in place, then evict while over budget
    pub fn add(&mut self, key: &str, value: V) {
        let new_weight = value.weight() as u64;
        if let Some(&id) = self.index.get(key) {
            self.detach(id);
            self.attach_front(id);
            if let Some(slot) = self.slots[id].as_mut() {
                self.used_bytes -= slot.value.weight() as u64;
                self.used_bytes += new_weight;
                slot.value = value;
            }
        } else {
            let id = self.alloc(Slot {
                key: key.to_string(),
                value,
                prev: NIL,
                next: NIL,
            });
            self.attach_front(id);
            self.index.insert(key.to_string(), id);
            self.used_bytes += key.len() as u64 + new_weight;
        }

        while self.max_bytes != 0 && self.used_bytes > self.max_bytes {
            self.delete_oldest();
        }
    }

    /// Remove the least-recently-used entry, if any
    pub fn delete_oldest(&mut self) {
        let id = self.tail;
        if id == NIL {
            return;
        }
        self.detach(id);
        if let Some(slot) = self.slots[id].take() {
            self.free.push(id);
            self.index.remove(&slot.key);
            self.used_bytes -= slot.key.len() as u64 + slot.value.weight() as u64;
            if let Some(hook) = self.on_evicted.as_mut() {
                hook(&slot.key, &slot.value);
            }
        }
    }

    /// Number of resident entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Bytes currently charged against the budget
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    fn alloc(&mut self, slot: Slot<V>) -> usize {
        if let Some(id) = self.free.pop() {
            self.slots[id] = Some(slot);
            id
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        }
    }

    fn links(&self, id: usize) -> (usize, usize) {
        match self.slots[id].as_ref() {
            Some(slot) => (slot.prev, slot.next),
            None => (NIL, NIL),
        }
    }

    /// Unlink a resident slot from the recency list
    fn detach(&mut self, id: usize) {
        let (prev, next) = self.links(id);
        if prev != NIL {
            if let Some(slot) = self.slots[prev].as_mut() {
                slot.next = next;
            }
        } else {
            self.head = next;
        }
        if next != NIL {
            if let Some(slot) = self.slots[next].as_mut() {
                slot.prev = prev;
            }
        } else {
            self.tail = prev;
        }
    }

    /// Link a detached slot in at the most-recently-used position
    fn attach_front(&mut self, id: usize) {
        let old_head = self.head;
        if let Some(slot) = self.slots[id].as_mut() {
            slot.prev = NIL;
            slot.next = old_head;
        }
        if old_head != NIL {
            if let Some(slot) = self.slots[old_head].as_mut() {
                slot.prev = id;
            }
        }
        self.head = id;
        if self.tail == NIL {
            self.tail = id;
        }
    }
}
