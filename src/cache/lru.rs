//! Sharded LRU cache with per-entry TTL.
//!
//! Each shard is a slab of nodes threaded on an intrusive doubly linked list
//! (head = most recently used) plus a key index, all behind one mutex. A key
//! always maps to the same shard, so promotion and eviction of one entry are
//! serialized by that shard's lock. Expiry is checked lazily on access.

use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, RandomState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::types::CacheStats;

const NIL: usize = usize::MAX;
const ENTRIES_PER_SHARD: usize = 256;
const MAX_SHARDS: usize = 16;

struct Node<K, V> {
    key: K,
    value: V,
    expires_at: Instant,
    prev: usize,
    next: usize,
}

enum Lookup<V> {
    Hit(V),
    Expired,
    Miss,
}

struct Shard<K, V> {
    index: HashMap<K, usize>,
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V: Clone> Shard<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(n) => (n.prev, n.next),
            None => return,
        };

        if prev == NIL {
            self.head = next;
        } else if let Some(p) = self.nodes[prev].as_mut() {
            p.next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else if let Some(n) = self.nodes[next].as_mut() {
            n.prev = prev;
        }
        if let Some(n) = self.nodes[idx].as_mut() {
            n.prev = NIL;
            n.next = NIL;
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(n) = self.nodes[idx].as_mut() {
            n.prev = NIL;
            n.next = old_head;
        }
        if old_head == NIL {
            self.tail = idx;
        } else if let Some(h) = self.nodes[old_head].as_mut() {
            h.prev = idx;
        }
        self.head = idx;
    }

    fn remove_at(&mut self, idx: usize) -> Option<Node<K, V>> {
        self.unlink(idx);
        let node = self.nodes[idx].take()?;
        self.index.remove(&node.key);
        self.free.push(idx);
        Some(node)
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn get(&mut self, key: &K, now: Instant) -> Lookup<V> {
        let Some(&idx) = self.index.get(key) else {
            return Lookup::Miss;
        };
        let expired = match &self.nodes[idx] {
            Some(n) => now >= n.expires_at,
            None => return Lookup::Miss,
        };

        if expired {
            self.remove_at(idx);
            return Lookup::Expired;
        }

        self.unlink(idx);
        self.push_front(idx);
        match &self.nodes[idx] {
            Some(n) => Lookup::Hit(n.value.clone()),
            None => Lookup::Miss,
        }
    }

    /// Returns `true` when an entry had to be evicted to make room.
    fn insert(&mut self, key: K, value: V, expires_at: Instant) -> bool {
        if let Some(&idx) = self.index.get(&key) {
            if let Some(n) = self.nodes[idx].as_mut() {
                n.value = value;
                n.expires_at = expires_at;
            }
            self.unlink(idx);
            self.push_front(idx);
            return false;
        }

        let mut evicted = false;
        if self.len() >= self.capacity && self.tail != NIL {
            evicted = self.remove_at(self.tail).is_some();
        }

        let idx = self.alloc(Node {
            key: key.clone(),
            value,
            expires_at,
            prev: NIL,
            next: NIL,
        });
        self.index.insert(key, idx);
        self.push_front(idx);
        evicted
    }

    fn remove(&mut self, key: &K) -> bool {
        match self.index.get(key).copied() {
            Some(idx) => self.remove_at(idx).is_some(),
            None => false,
        }
    }

    fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    fn expired_count(&self, now: Instant) -> usize {
        self.nodes
            .iter()
            .flatten()
            .filter(|n| now >= n.expires_at)
            .count()
    }

    #[cfg(test)]
    fn keys_mru_order(&self) -> Vec<K> {
        let mut out = Vec::with_capacity(self.len());
        let mut cur = self.head;
        while cur != NIL {
            match &self.nodes[cur] {
                Some(n) => {
                    out.push(n.key.clone());
                    cur = n.next;
                }
                None => break,
            }
        }
        out
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    evictions: AtomicU64,
    expired: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        for c in [
            &self.hits,
            &self.misses,
            &self.sets,
            &self.deletes,
            &self.evictions,
            &self.expired,
        ] {
            c.store(0, Ordering::Relaxed);
        }
    }
}

/// Concurrent size-bounded LRU cache with per-entry time-to-live.
///
/// Capacity is split exactly across shards; LRU order is kept per shard.
/// Caches below 512 entries use a single shard and are strictly LRU.
pub struct TtlLruCache<K, V> {
    shards: Box<[Mutex<Shard<K, V>>]>,
    hasher: RandomState,
    capacity: usize,
    counters: Counters,
}

impl<K: Hash + Eq + Clone, V: Clone> TtlLruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let shard_count = (capacity / ENTRIES_PER_SHARD).clamp(1, MAX_SHARDS);
        Self::with_shards(capacity, shard_count)
    }

    /// `shard_count` is clamped to `1..=capacity`.
    pub fn with_shards(capacity: usize, shard_count: usize) -> Self {
        let capacity = capacity.max(1);
        let shard_count = shard_count.clamp(1, capacity);
        let base = capacity / shard_count;
        let extra = capacity % shard_count;

        let shards = (0..shard_count)
            .map(|i| Mutex::new(Shard::new(base + usize::from(i < extra))))
            .collect();

        Self {
            shards,
            hasher: RandomState::new(),
            capacity,
            counters: Counters::default(),
        }
    }

    fn shard(&self, key: &K) -> &Mutex<Shard<K, V>> {
        let idx = (self.hasher.hash_one(key) as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Returns the live value and promotes it; expired entries are purged.
    pub fn get(&self, key: &K) -> Option<V> {
        let lookup = self.shard(key).lock().get(key, Instant::now());
        match lookup {
            Lookup::Hit(v) => {
                Counters::bump(&self.counters.hits);
                Some(v)
            }
            Lookup::Expired => {
                Counters::bump(&self.counters.expired);
                Counters::bump(&self.counters.misses);
                None
            }
            Lookup::Miss => {
                Counters::bump(&self.counters.misses);
                None
            }
        }
    }

    /// Inserts or replaces `key`, evicting the shard's LRU entry when full.
    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or(now + Duration::from_secs(u32::MAX as u64));
        let evicted = self.shard(&key).lock().insert(key, value, expires_at);

        Counters::bump(&self.counters.sets);
        if evicted {
            Counters::bump(&self.counters.evictions);
        }
    }

    pub fn remove(&self, key: &K) -> bool {
        let removed = self.shard(key).lock().remove(key);
        if removed {
            Counters::bump(&self.counters.deletes);
        }
        removed
    }

    /// Drops every entry; counters are kept.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.lock().clear();
        }
    }

    pub fn reset_counters(&self) {
        self.counters.reset();
    }

    /// Entries currently held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let (size, expired_entries) = self.shards.iter().fold((0, 0), |(size, exp), s| {
            let s = s.lock();
            (size + s.len(), exp + s.expired_count(now))
        });

        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let hits = load(&self.counters.hits);
        let misses = load(&self.counters.misses);
        let total = hits + misses;

        CacheStats {
            kind: "memory".to_string(),
            available: true,
            size,
            max_size: self.capacity,
            hits,
            misses,
            sets: load(&self.counters.sets),
            deletes: load(&self.counters.deletes),
            evictions: load(&self.counters.evictions),
            expired: load(&self.counters.expired),
            expired_entries,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn keys_mru_order(&self) -> Vec<K> {
        self.shards
            .iter()
            .flat_map(|s| s.lock().keys_mru_order())
            .collect()
    }
}

impl<K, V> std::fmt::Debug for TtlLruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlLruCache")
            .field("capacity", &self.capacity)
            .field("shards", &self.shards.len())
            .finish()
    }
}
