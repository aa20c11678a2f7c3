use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    compute_time: Duration,
}

struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Keys in insertion order, oldest at the front.
    order: VecDeque<K>,
    hits: u64,
    misses: u64,
    time_saved: Duration,
}

impl<K: Eq + Hash, V> Inner<K, V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
            time_saved: Duration::ZERO,
        }
    }

    fn remove(&mut self, key: &K) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

/// Hit/miss counters for one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    /// Sum of the compute times of every hit.
    #[serde(with = "duration_secs")]
    pub time_saved: Duration,
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

/// Size-bounded memoization map with optional TTL and FIFO eviction.
///
/// All operations take one mutex for their whole read-modify-write; the lock is
/// never held while a value is being computed.
pub struct TimedCache<K, V> {
    name: &'static str,
    max_size: usize,
    ttl: Option<Duration>,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> TimedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(max_size: usize, ttl: Option<Duration>) -> Self {
        Self::named("cache", max_size, ttl)
    }

    pub fn named(name: &'static str, max_size: usize, ttl: Option<Duration>) -> Self {
        Self {
            name,
            max_size: max_size.max(1),
            ttl,
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    // A panic in another thread leaves the map consistent (no operation
    // panics mid-update), so a poisoned lock is simply reused.
    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &CacheEntry<V>) -> bool {
        match self.ttl {
            Some(ttl) => entry.inserted_at.elapsed() >= ttl,
            None => false,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.lock();
        let state = inner.entries.get(key).map(|e| (self.is_expired(e), e.compute_time));
        match state {
            Some((false, compute_time)) => {
                inner.hits += 1;
                inner.time_saved += compute_time;
                inner.entries.get(key).map(|e| e.value.clone())
            }
            Some((true, _)) => {
                inner.remove(key);
                inner.misses += 1;
                debug!(cache = self.name, "Expired entry removed");
                None
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert or replace. A new key at capacity evicts the oldest-inserted entry.
    pub fn set(&self, key: K, value: V, compute_time: Duration) {
        let mut inner = self.lock();
        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.value = value;
            entry.inserted_at = Instant::now();
            entry.compute_time = compute_time;
            return;
        }

        while inner.entries.len() >= self.max_size {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            debug!(cache = self.name, "Evicted oldest entry");
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                compute_time,
            },
        );
    }

    /// Cached value for `key`, or compute it with `f` outside the lock and store it.
    pub fn get_or_insert_with(&self, key: K, f: impl FnOnce() -> V) -> V {
        if let Some(v) = self.get(&key) {
            return v;
        }
        let started = Instant::now();
        let value = f();
        self.set(key, value.clone(), started.elapsed());
        value
    }

    /// Like `get_or_insert_with`, but errors are returned and not cached.
    pub fn try_get_or_insert_with<E>(
        &self,
        key: K,
        f: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }
        let started = Instant::now();
        let value = f()?;
        self.set(key, value.clone(), started.elapsed());
        Ok(value)
    }

    pub fn contains(&self, key: &K) -> bool {
        let inner = self.lock();
        inner.entries.get(key).is_some_and(|e| !self.is_expired(e))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let lookups = inner.hits + inner.misses;
        CacheStats {
            entries: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                inner.hits as f64 / lookups as f64
            },
            time_saved: inner.time_saved,
        }
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&self) {
        let mut inner = self.lock();
        *inner = Inner::new();
    }
}
