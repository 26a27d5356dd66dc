//! Consistent-hash ring with virtual replicas
//!
//! Maps a key deterministically to the peer that owns it. Every real peer
//! contributes `replicas` virtual positions on the ring, which smooths key
//! distribution across a small fleet; a key is owned by the peer behind the
//! first ring position at or after the key's own hash, wrapping around the
//! top of the hash space.
//!
//! The default hash is CRC32/IEEE. It is fast and spreads short string keys
//! adequately; nothing here needs cryptographic strength, but every node in
//! a fleet must use the same function or keys will be routed inconsistently.

use std::collections::HashMap;

/// Hash function mapping bytes to a ring position
pub type HashFn = fn(&[u8]) -> u32;

/// Consistent-hash ring mapping keys to peer identifiers.
pub struct HashRing {
    replicas: usize,
    hash: HashFn,
    /// Virtual node positions, sorted ascending
    positions: Vec<u32>,
    /// Position back to the real peer that produced it
    owners: HashMap<u32, String>,
}

impl HashRing {
    /// Create an empty ring with the default CRC32/IEEE hash
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, crc32fast::hash)
    }

    /// Create an empty ring with a custom hash function
    pub fn with_hasher(replicas: usize, hash: HashFn) -> Self {
        Self {
            replicas,
            hash,
            positions: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Add real peers to the ring.
    ///
    /// Each peer is expanded into `replicas` virtual positions hashed from
    /// `peer` followed by the decimal replica index. If two peers collide on
    /// a position, the later addition owns it; every node must apply the
    /// same rule for routing to stay consistent across the fleet.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let position = (self.hash)(format!("{peer}{i}").as_bytes());
                self.positions.push(position);
                self.owners.insert(position, peer.to_string());
            }
        }
        self.positions.sort_unstable();
    }

    /// Resolve the peer owning `key`.
    ///
    /// Returns `None` for an empty key or an empty ring. A key hashing past
    /// the highest position wraps to the lowest.
    pub fn owner(&self, key: &str) -> Option<&str> {
        if key.is_empty() || self.positions.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let idx = self.positions.partition_point(|&position| position < hash);
        let position = self.positions[idx % self.positions.len()];
        self.owners.get(&position).map(String::as_str)
    }

    /// Whether the ring has no peers
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of virtual positions on the ring
    pub fn len(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Hash that parses its input as a decimal integer, making ring
    /// positions easy to reason about in tests
    fn decimal_hash(data: &[u8]) -> u32 {
        std::str::from_utf8(data).unwrap().parse().unwrap()
    }

    #[test]
    fn test_owner_lookup() {
        let mut ring = HashRing::with_hasher(3, decimal_hash);
        // Virtual positions: 20/21/22, 40/41/42, 60/61/62
        ring.add(["6", "4", "2"]);

        assert_eq!(ring.owner("2"), Some("2"));
        assert_eq!(ring.owner("11"), Some("2"));
        assert_eq!(ring.owner("23"), Some("4"));
        assert_eq!(ring.owner("27"), Some("4"));
        // Past the top position, ownership wraps to the lowest
        assert_eq!(ring.owner("63"), Some("2"));

        // Adding a peer takes over the keys that now hash closest to it
        ring.add(["8"]);
        assert_eq!(ring.owner("63"), Some("8"));
        assert_eq!(ring.owner("27"), Some("4"));
    }

    #[test]
    fn test_empty_key_and_empty_ring() {
        let mut ring = HashRing::with_hasher(3, decimal_hash);
        assert!(ring.is_empty());
        assert_eq!(ring.owner("anything"), None);

        ring.add(["2"]);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.owner(""), None);
    }

    #[test]
    fn test_deterministic_for_fixed_peer_set() {
        let mut a = HashRing::new(50);
        let mut b = HashRing::new(50);
        a.add(["peer-1", "peer-2", "peer-3"]);
        b.add(["peer-1", "peer-2", "peer-3"]);

        for i in 0..1000 {
            let key = format!("object-{i}");
            assert_eq!(a.owner(&key), b.owner(&key));
        }
    }

    #[test]
    fn test_collision_later_add_wins() {
        fn constant_hash(_data: &[u8]) -> u32 {
            42
        }
        let mut ring = HashRing::with_hasher(1, constant_hash);
        ring.add(["first"]);
        ring.add(["second"]);
        assert_eq!(ring.owner("key"), Some("second"));
    }

    #[test]
    fn test_balance_with_default_hash() {
        use rand::{distributions::Alphanumeric, Rng, SeedableRng};

        let peers = ["n1", "n2", "n3", "n4", "n5"];
        let mut ring = HashRing::new(50);
        ring.add(peers);

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let key: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(12)
                .map(char::from)
                .collect();
            let owner = ring.owner(&key).unwrap().to_string();
            *counts.entry(owner).or_default() += 1;
        }

        // Loose bound against catastrophic clumping, not a uniformity proof
        let mean = 10_000 / peers.len();
        for (peer, count) in counts {
            assert!(
                count <= mean * 3,
                "peer {peer} owns {count} of 10000 keys (mean {mean})"
            );
        }
    }
}
