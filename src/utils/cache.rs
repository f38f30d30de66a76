use crate::data_sync::pool::PoolHandle;
use alloy_primitives::Address;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Unordered token pair, stored with the lower address first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(Address, Address);

impl PairKey {
    pub fn new(token_a: Address, token_b: Address) -> Self {
        if token_a <= token_b { PairKey(token_a, token_b) } else { PairKey(token_b, token_a) }
    }

    pub fn tokens(&self) -> (Address, Address) {
        (self.0, self.1)
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 { 0.0 } else { hits as f64 / total as f64 }
    }
}

#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<PairKey, (PoolHandle, u64)>,
    // recency tick -> key, oldest first
    order: BTreeMap<u64, PairKey>,
    tick: u64,
}

impl LruState {
    fn touch(&mut self, key: PairKey) -> Option<PoolHandle> {
        self.tick += 1;
        let tick = self.tick;
        let (pool, last_used) = self.entries.get_mut(&key)?;
        self.order.remove(last_used);
        *last_used = tick;
        self.order.insert(tick, key);
        Some(pool.clone())
    }
}

/// Bounded least-recently-used map from an unordered token pair to a resolved pool.
///
/// A single mutex guards lookup, insertion and eviction. It is never held across
/// a network call. Capacity 0 disables caching.
#[derive(Debug)]
pub struct PoolCache {
    capacity: usize,
    state: Mutex<LruState>,
    pub stats: CacheStats,
}

impl PoolCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, state: Mutex::new(LruState::default()), stats: CacheStats::default() }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, token_a: Address, token_b: Address) -> Option<PoolHandle> {
        if self.capacity == 0 {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.touch(PairKey::new(token_a, token_b)) {
            Some(pool) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(pool)
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Inserts the pool under its pair, evicting the least recently used entry when full.
    /// Returns the evicted key, if any.
    pub fn insert(&self, pool: PoolHandle) -> Option<PairKey> {
        if self.capacity == 0 {
            return None;
        }
        let key = PairKey::new(pool.token0, pool.token1);
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = &mut *guard;

        if let Some((cached, _)) = state.entries.get_mut(&key) {
            *cached = pool;
            state.touch(key);
            return None;
        }

        let mut evicted = None;
        if state.entries.len() >= self.capacity {
            if let Some((_, oldest)) = state.order.pop_first() {
                state.entries.remove(&oldest);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                evicted = Some(oldest);
            }
        }

        state.tick += 1;
        let tick = state.tick;
        state.entries.insert(key, (pool, tick));
        state.order.insert(tick, key);
        evicted
    }

    pub fn contains(&self, token_a: Address, token_b: Address) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.contains_key(&PairKey::new(token_a, token_b))
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = &mut *guard;
        state.entries.clear();
        state.order.clear();
    }
}
