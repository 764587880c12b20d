//! Bounded LRU cache.
//!
//! Used by collaborators to avoid repeated expensive recipient-discovery
//! lookups. Holds at most `max_size` entries; on overflow the
//! least-recently-touched entry is evicted, where reads and writes both
//! count as a touch. A `max_size` of zero disables storage entirely.
//!
//! Methods take `&mut self`, so exclusive access is compiler-enforced;
//! sharing one cache across threads requires an explicit `Mutex` around it.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use tracing::trace;

/// Default entry bound, matching the collaborators' historical sizing.
pub const DEFAULT_MAX_SIZE: usize = 1024;

struct Entry<V> {
    value: V,
    stamp: u64,
}

/// A bounded map evicting the least-recently-touched entry on overflow.
pub struct LruCache<K, V> {
    max_size: usize,
    clock: u64,
    entries: HashMap<K, Entry<V>>,
    recency: BTreeMap<u64, K>,
}

impl<K: Clone + Eq + Hash, V> LruCache<K, V> {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            clock: 0,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
        }
    }

    /// Look up a key, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.stamp);
            entry.stamp = self.clock;
            self.recency.insert(self.clock, key.clone());
            self.clock += 1;
        }
        self.entries.get(key).map(|e| &e.value)
    }

    /// Insert or replace a key, promoting it to most-recently-used.
    ///
    /// A no-op when `max_size` is zero.
    pub fn put(&mut self, key: K, value: V) {
        if self.max_size == 0 {
            return;
        }
        let entry = Entry {
            value,
            stamp: self.clock,
        };
        if let Some(old) = self.entries.insert(key.clone(), entry) {
            self.recency.remove(&old.stamp);
        }
        self.recency.insert(self.clock, key);
        self.clock += 1;
        self.evict_to_bound();
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the bound, immediately evicting down to it if it shrank.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        if max_size == 0 {
            self.clear();
        } else {
            self.evict_to_bound();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn evict_to_bound(&mut self) {
        while self.entries.len() > self.max_size {
            match self.recency.pop_first() {
                Some((stamp, key)) => {
                    self.entries.remove(&key);
                    trace!(stamp, "evicted least-recently-used cache entry");
                }
                None => break,
            }
        }
    }
}

impl<K: Clone + Eq + Hash, V> Default for LruCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}
