// Context cache: TTL-bounded, size-bounded map from (category, location) to a
// computed bundle.
//
// Entries are Fresh while younger than the TTL and Stale afterwards. Stale
// entries are never served but stay resident until overwritten, evicted or
// purged. When a write pushes the map past `max_size`, every entry is scored by
// the eviction policy and only the top `retain_count()` survive.
//
// A single mutex guards the map and the counters. It is never held across an
// `.await`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use pulse_common::{CacheKey, CachePolicy};
use serde::Serialize;
use tracing::{debug, info};

// --- Clock ---

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Eviction ---

/// Bookkeeping for one entry, as seen by an eviction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStats {
    pub created_at: DateTime<Utc>,
    pub last_access_at: DateTime<Utc>,
    pub access_count: u64,
}

/// Higher score = more worth keeping.
pub trait EvictionPolicy: Send + Sync {
    fn score(&self, entry: &EntryStats, now: DateTime<Utc>) -> f64;
}

/// `access_count * access_weight - minutes_since_last_access * age_weight`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridScore {
    pub access_weight: f64,
    pub age_weight: f64,
}

impl Default for HybridScore {
    fn default() -> Self {
        Self::from(&CachePolicy::default())
    }
}

impl From<&CachePolicy> for HybridScore {
    fn from(policy: &CachePolicy) -> Self {
        Self {
            access_weight: policy.access_weight,
            age_weight: policy.age_weight,
        }
    }
}

impl EvictionPolicy for HybridScore {
    fn score(&self, entry: &EntryStats, now: DateTime<Utc>) -> f64 {
        let idle_ms = (now - entry.last_access_at).num_milliseconds().max(0);
        let idle_minutes = idle_ms as f64 / 60_000.0;
        entry.access_count as f64 * self.access_weight - idle_minutes * self.age_weight
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LeastRecentlyUsed;

impl EvictionPolicy for LeastRecentlyUsed {
    fn score(&self, entry: &EntryStats, _now: DateTime<Utc>) -> f64 {
        entry.last_access_at.timestamp_millis() as f64
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LeastFrequentlyUsed;

impl EvictionPolicy for LeastFrequentlyUsed {
    fn score(&self, entry: &EntryStats, _now: DateTime<Utc>) -> f64 {
        entry.access_count as f64
    }
}

// --- Cache ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

struct Entry<V> {
    value: V,
    stats: EntryStats,
}

struct Inner<V> {
    entries: HashMap<CacheKey, Entry<V>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

pub struct ContextCache<V> {
    inner: Mutex<Inner<V>>,
    policy: CachePolicy,
    ttl: chrono::Duration,
    eviction: Box<dyn EvictionPolicy>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ContextCache<V> {
    /// A cache scored with `HybridScore` weighted from `policy`.
    pub fn new(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self::with_eviction(policy, Box::new(HybridScore::from(&policy)), clock)
    }

    pub fn with_eviction(
        policy: CachePolicy,
        eviction: Box<dyn EvictionPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ttl = chrono::Duration::from_std(policy.ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            policy,
            ttl,
            eviction,
            clock,
        }
    }

    // A panic while holding the lock leaves the map structurally valid.
    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, stats: &EntryStats, now: DateTime<Utc>) -> bool {
        now - stats.created_at < self.ttl
    }

    /// The value for `key` if present and fresh. A hit bumps the entry's
    /// access count and last-access time.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.lock();

        let fresh = inner
            .entries
            .get(key)
            .is_some_and(|entry| self.is_fresh(&entry.stats, now));
        if !fresh {
            inner.misses += 1;
            debug!(key = %key, "Cache miss");
            return None;
        }

        inner.hits += 1;
        let entry = inner.entries.get_mut(key)?;
        entry.stats.access_count += 1;
        entry.stats.last_access_at = now;
        debug!(key = %key, access_count = entry.stats.access_count, "Cache hit");
        Some(entry.value.clone())
    }

    /// Insert or overwrite. Overwriting restarts the entry's lifetime and
    /// resets its access count.
    pub fn put(&self, key: CacheKey, value: V) {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.entries.insert(
            key,
            Entry {
                value,
                stats: EntryStats {
                    created_at: now,
                    last_access_at: now,
                    access_count: 0,
                },
            },
        );

        if inner.entries.len() > self.policy.max_size {
            self.evict(&mut inner, now);
        }
    }

    fn evict(&self, inner: &mut Inner<V>, now: DateTime<Utc>) {
        let mut ranked: Vec<(CacheKey, f64, DateTime<Utc>)> = inner
            .entries
            .iter()
            .map(|(key, entry)| {
                (
                    key.clone(),
                    self.eviction.score(&entry.stats, now),
                    entry.stats.last_access_at,
                )
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.2.cmp(&a.2))
                .then_with(|| a.0.cmp(&b.0))
        });

        let keep = self.policy.retain_count();
        let before = inner.entries.len();
        for (key, _, _) in ranked.into_iter().skip(keep) {
            inner.entries.remove(&key);
        }
        let evicted = before - inner.entries.len();
        inner.evictions += evicted as u64;
        info!(evicted, remaining = inner.entries.len(), "Cache eviction sweep");
    }

    /// Drop every stale entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| now - entry.stats.created_at < self.ttl);
        let purged = before - inner.entries.len();
        if purged > 0 {
            debug!(purged, "Purged expired cache entries");
        }
        purged
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Bookkeeping for `key`, fresh or stale, without counting as an access.
    pub fn entry_stats(&self, key: &CacheKey) -> Option<EntryStats> {
        self.lock().entries.get(key).map(|entry| entry.stats)
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            entries: inner.entries.len(),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }
}
