//! Expiring cache store and its background cleanup task

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default maximum number of entries held at once
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default period between background cleanup sweeps
pub const DEFAULT_CLEANUP_PERIOD: Duration = Duration::from_secs(60);

/// A stored value together with its expiry deadline
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Shared interior state; guarded by a mutex on the handle
#[derive(Debug)]
struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Keys in first-insertion order, oldest at the front
    insertion_order: VecDeque<String>,
    hit_count: u64,
    miss_count: u64,
}

impl<V> CacheInner<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            hit_count: 0,
            miss_count: 0,
        }
    }
}

/// Snapshot of cache occupancy and lookup accounting
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    /// Number of live entries currently stored
    pub size: usize,
    /// Configured entry limit
    pub max_entries: usize,
    /// Lookups served from a live entry
    pub hit_count: u64,
    /// Lookups that found nothing usable
    pub miss_count: u64,
    /// Percentage of lookups that hit, 0-100, rounded to two decimals
    pub hit_rate: f64,
    /// Keys currently stored, oldest-inserted first
    pub keys: Vec<String>,
}

/// Bounded key-value store whose entries expire after a per-entry TTL
///
/// Cloning the cache produces another handle to the same underlying store,
/// so the background cleanup task and request handlers share one set of
/// entries. Values are stored and returned by value; the cache never hands
/// out references into its own state.
///
/// Eviction is by insertion order: when a new key would exceed the entry
/// limit, the oldest-inserted key is dropped, regardless of how recently
/// it was read.
#[derive(Debug, Clone)]
pub struct ExpiringCache<V> {
    inner: Arc<Mutex<CacheInner<V>>>,
    max_entries: usize,
}

impl<V: Clone> Default for ExpiringCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl<V: Clone> ExpiringCache<V> {
    /// Creates a new cache holding at most `max_entries` entries
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner::new())),
            // a zero-capacity cache could never serve a hit
            max_entries: max_entries.max(1),
        }
    }

    /// Locks the interior state, recovering from a poisoned mutex (the
    /// stored data stays usable even if another thread panicked)
    fn lock(&self) -> MutexGuard<'_, CacheInner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes an entry from the map and the insertion-order queue.
    /// All deletion paths (reads, removals, eviction, cleanup) go through
    /// here so the two structures cannot drift apart.
    fn remove_entry(inner: &mut CacheInner<V>, key: &str) -> bool {
        let existed = inner.entries.remove(key).is_some();
        if existed {
            inner.insertion_order.retain(|k| k != key);
        }
        existed
    }

    /// Stores a value under a key for the given time-to-live.
    ///
    /// Returns `false` without mutating anything when the key is empty or
    /// the TTL is zero. Overwriting an existing key updates the value and
    /// expiry but keeps the key's original insertion position and triggers
    /// no eviction; inserting a new key at capacity first evicts the
    /// oldest-inserted entry.
    pub fn insert(&self, key: &str, value: V, ttl: Duration) -> bool {
        if key.is_empty() {
            warn!("rejected cache insert with empty key");
            return false;
        }
        if ttl.is_zero() {
            warn!(key, "rejected cache insert with zero ttl");
            return false;
        }

        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };

        let mut inner = self.lock();
        if inner.entries.contains_key(key) {
            inner.entries.insert(key.to_string(), entry);
            return true;
        }

        if inner.entries.len() >= self.max_entries {
            if let Some(oldest) = inner.insertion_order.front().cloned() {
                Self::remove_entry(&mut inner, &oldest);
                debug!(evicted = %oldest, "evicted oldest entry to make room");
            }
        }

        inner.insertion_order.push_back(key.to_string());
        inner.entries.insert(key.to_string(), entry);
        true
    }

    /// Looks up a live value.
    ///
    /// A present-but-expired entry is deleted before anything is returned,
    /// so callers never observe a value past its deadline. Every call
    /// counts as exactly one hit or one miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.lock();

        let expired = matches!(inner.entries.get(key), Some(entry) if entry.expires_at <= now);
        if expired {
            Self::remove_entry(&mut inner, key);
            debug!(key, "cache entry expired on read");
        }

        let value = inner.entries.get(key).map(|entry| entry.value.clone());
        match value {
            Some(v) => {
                inner.hit_count += 1;
                Some(v)
            }
            None => {
                inner.miss_count += 1;
                None
            }
        }
    }

    /// Removes an entry; idempotent. Returns whether one existed.
    pub fn remove(&self, key: &str) -> bool {
        let mut inner = self.lock();
        Self::remove_entry(&mut inner, key)
    }

    /// Whether a live entry exists for the key.
    ///
    /// Routes through [`get`](Self::get) so the lookup is classified as a
    /// hit or miss exactly once.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Drops all entries and resets the hit/miss counters
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.insertion_order.clear();
        inner.hit_count = 0;
        inner.miss_count = 0;
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry whose deadline has passed, independent of
    /// access pattern, and returns how many were dropped.
    ///
    /// This is the synchronous sweep behind the background cleanup task;
    /// tests call it directly instead of waiting on timers. It does not
    /// touch the hit/miss counters.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();

        let expired_keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            Self::remove_entry(&mut inner, key);
        }

        if !expired_keys.is_empty() {
            debug!(count = expired_keys.len(), "purged expired cache entries");
        }
        expired_keys.len()
    }

    /// Snapshot of occupancy and lookup accounting
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let total = inner.hit_count + inner.miss_count;
        let hit_rate = if total == 0 {
            0.0
        } else {
            let rate = inner.hit_count as f64 / total as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        };

        CacheStats {
            size: inner.entries.len(),
            max_entries: self.max_entries,
            hit_count: inner.hit_count,
            miss_count: inner.miss_count,
            hit_rate,
            keys: inner.insertion_order.iter().cloned().collect(),
        }
    }
}

impl<V: Clone + Send + 'static> ExpiringCache<V> {
    /// Spawns a background task that sweeps expired entries on a fixed
    /// period, returning a handle that stops it.
    ///
    /// The task shares this cache's state and uses the same deletion path
    /// as `get`/`remove`, so accounting stays consistent.
    pub fn spawn_cleanup(&self, period: Duration) -> CleanupHandle {
        let cache = self.clone();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // Skip the first tick (immediate)
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        cache.purge_expired();
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        CleanupHandle { shutdown_tx }
    }
}

/// Handle for stopping a background cleanup task
pub struct CleanupHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CleanupHandle {
    /// Stops the background cleanup task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}
