//! Lock-striped concurrent containers for packed keys.
//!
//! Visited sets, depth buckets and pending-work maps all share the same
//! design: a fixed number of shards, each an ordinary hash container
//! behind its own mutex, selected by hashing the key. Writers contend
//! only within a shard, and a shard is also the natural unit of work
//! when a batch is fanned out across worker threads.

use std::hash::{Hash, Hasher};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

use crate::packed::PackedKey;

/// Number of stripes. A power of two, sized to stay ahead of the worker
/// count on common hardware.
pub const SHARD_COUNT: usize = 16;

#[inline]
fn shard_index(key: &PackedKey) -> usize {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    (hasher.finish() as usize) & (SHARD_COUNT - 1)
}

/// Concurrent set of packed keys.
pub struct ShardedSet {
    shards: Vec<Mutex<FxHashSet<PackedKey>>>,
}

impl ShardedSet {
    #[must_use]
    pub fn new() -> Self {
        ShardedSet {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(FxHashSet::default())).collect(),
        }
    }

    /// Insert a key, returning true iff it was not present.
    ///
    /// Atomic per key relative to concurrent inserts of the same key:
    /// exactly one caller observes true.
    pub fn insert_if_absent(&self, key: PackedKey) -> bool {
        self.shards[shard_index(&key)].lock().insert(key)
    }

    /// Total number of keys. Exact only while no writers are active.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.lock().is_empty())
    }

    /// Tear the set into per-shard key lists, one claimable unit of work
    /// per shard.
    #[must_use]
    pub fn into_shards(self) -> Vec<Vec<PackedKey>> {
        self.shards
            .into_iter()
            .map(|shard| shard.into_inner().into_iter().collect())
            .collect()
    }
}

impl Default for ShardedSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Concurrent map from packed key to remaining depth budget.
pub struct ShardedDepthMap {
    shards: Vec<Mutex<FxHashMap<PackedKey, i16>>>,
}

impl ShardedDepthMap {
    #[must_use]
    pub fn new() -> Self {
        ShardedDepthMap {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(FxHashMap::default())).collect(),
        }
    }

    /// Insert a key, or raise its stored depth to the given value.
    ///
    /// A position queued twice keeps the larger budget, so it is expanded
    /// at the maximum depth any predecessor ever offered.
    pub fn upsert_max(&self, key: PackedKey, depth: i16) {
        let mut shard = self.shards[shard_index(&key)].lock();
        shard
            .entry(key)
            .and_modify(|stored| {
                if *stored < depth {
                    *stored = depth;
                }
            })
            .or_insert(depth);
    }

    /// Stored depth for a key, if present.
    #[must_use]
    pub fn depth_of(&self, key: &PackedKey) -> Option<i16> {
        self.shards[shard_index(key)].lock().get(key).copied()
    }

    /// Total number of entries. Exact only while no writers are active.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.lock().is_empty())
    }

    /// Drain every entry, releasing shard capacity.
    pub fn take_entries(&mut self) -> Vec<(PackedKey, i16)> {
        let mut entries = Vec::new();
        for shard in &mut self.shards {
            entries.extend(shard.get_mut().drain());
        }
        entries
    }
}

impl Default for ShardedDepthMap {
    fn default() -> Self {
        Self::new()
    }
}
