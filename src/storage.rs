//! Storage for resolved entries
//!
//! Uses DashMap for lock-free concurrent access. Once an entry has been
//! resolved through `get`, its value lives here and later lookups return it
//! without touching the definition.

use crate::Value;
use ahash::RandomState;
use dashmap::DashMap;

/// Thread-safe map from entry name to resolved value
pub struct EntryStorage {
    entries: DashMap<String, Value, RandomState>,
}

impl EntryStorage {
    /// Create new empty storage.
    ///
    /// Uses 8 shards; default DashMap sizing (num_cpus * 4) is more than a
    /// container with a few dozen entries needs.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with pre-allocated capacity, scaling shards with it.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            entries: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
        }
    }

    #[inline]
    pub fn insert(&self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Forget a resolved entry; returns whether it was present
    #[inline]
    pub fn remove(&self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that fit without reallocating
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    #[inline]
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Names of every resolved entry
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|r| r.key().clone()).collect()
    }
}

impl Default for EntryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EntryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStorage")
            .field("count", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
