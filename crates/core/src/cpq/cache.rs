//! Bounded LRU cache with optional TTL and hit-rate accounting.
//!
//! Shared across concurrent requests. Values are computed outside the lock, so two racing
//! misses may both compute; both results are identical because pricing is pure.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
    pub size: usize,
    pub capacity: usize,
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    last_used: u64,
}

struct CacheState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    recency: BTreeMap<u64, K>,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K, V> Default for CacheState<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            tick: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }
}

pub struct PricingCache<K, V> {
    state: Mutex<CacheState<K, V>>,
    capacity: usize,
    ttl: Option<Duration>,
}

impl<K, V> PricingCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self { state: Mutex::new(CacheState::default()), capacity: capacity.max(1), ttl }
    }

    fn state(&self) -> MutexGuard<'_, CacheState<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.state();
        let expired = match state.entries.get(key) {
            Some(entry) => self.is_expired(entry),
            None => {
                state.misses += 1;
                return None;
            }
        };

        if expired {
            if let Some(entry) = state.entries.remove(key) {
                state.recency.remove(&entry.last_used);
            }
            state.misses += 1;
            return None;
        }

        state.tick += 1;
        let tick = state.tick;
        let state = &mut *state;
        let entry = state.entries.get_mut(key)?;
        state.recency.remove(&entry.last_used);
        entry.last_used = tick;
        state.recency.insert(tick, key.clone());
        state.hits += 1;
        Some(entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        let mut state = self.state();
        state.tick += 1;
        let tick = state.tick;

        if let Some(previous) = state.entries.remove(&key) {
            state.recency.remove(&previous.last_used);
        }

        while state.entries.len() >= self.capacity {
            let Some((_, oldest)) = state.recency.pop_first() else {
                break;
            };
            state.entries.remove(&oldest);
            state.evictions += 1;
        }

        state.recency.insert(tick, key.clone());
        let entry = CacheEntry { value, inserted_at: Instant::now(), last_used: tick };
        state.entries.insert(key, entry);
    }

    /// Read-through access: returns the cached value or computes, stores and returns it.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Drops every entry; counters are kept.
    pub fn clear(&self) {
        let mut state = self.state();
        state.entries.clear();
        state.recency.clear();
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state();
        let lookups = state.hits + state.misses;
        let hit_rate = if lookups == 0 { 0.0 } else { state.hits as f64 / lookups as f64 };
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            hit_rate,
            evictions: state.evictions,
            size: state.entries.len(),
            capacity: self.capacity,
        }
    }

    fn is_expired(&self, entry: &CacheEntry<V>) -> bool {
        self.ttl.is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }
}
