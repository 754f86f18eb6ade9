//! Expiring in-memory cache.
//!
//! Entries carry an absolute expiry in epoch milliseconds. A read at or past
//! the expiry evicts the entry and reports a miss. Time comes from a [`Clock`]
//! so tests can drive expiry without sleeping.
//!
//! Concurrent misses are not coalesced: two callers that both miss will both
//! fetch upstream and the later `insert` wins.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(duration_ms)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(duration_ms(by), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// A cached value and when it stops being valid.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// `None` never expires.
    pub expires_at_ms: Option<u64>,
}

impl<V> CacheEntry<V> {
    pub fn is_fresh(&self, now_ms: u64) -> bool {
        self.expires_at_ms.map_or(true, |expires| now_ms < expires)
    }
}

/// Key to entry map with per-entry expiry.
pub struct ExpiringCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Fresh value for `key`. A stale entry is evicted and reported as absent.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now_ms();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if entry.is_fresh(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value` for `ttl` from now. Returns the absolute expiry.
    pub fn insert(&self, key: K, value: V, ttl: Duration) -> u64 {
        let expires_at_ms = self.clock.now_ms().saturating_add(duration_ms(ttl));
        self.insert_until(key, value, expires_at_ms);
        expires_at_ms
    }

    /// Store `value` until the given epoch-millisecond instant.
    pub fn insert_until(&self, key: K, value: V, expires_at_ms: u64) {
        self.entries.lock().insert(
            key,
            CacheEntry {
                value,
                expires_at_ms: Some(expires_at_ms),
            },
        );
    }

    /// Store `value` with no expiry.
    pub fn insert_permanent(&self, key: K, value: V) {
        self.entries.lock().insert(
            key,
            CacheEntry {
                value,
                expires_at_ms: None,
            },
        );
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.lock().remove(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Whether an entry is held, fresh or not yet evicted.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn expires_at(&self, key: &K) -> Option<u64> {
        self.entries
            .lock()
            .get(key)
            .and_then(|entry| entry.expires_at_ms)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

impl<K, V> fmt::Debug for ExpiringCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("entries", &self.entries.lock().len())
            .field("clock", &self.clock)
            .finish()
    }
}
