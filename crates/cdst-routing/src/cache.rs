//! Sharded, TTL-expiring cache of distance estimates.
//!
//! A process-wide cache with effectively lock-free reads and sharded-lock
//! writes (16 shards by coordinate hash), so concurrent
//! scenarios never contend on a single mutex. `RwLock` reads are the
//! "lock-free enough" approximation of that used here — the same
//! `RwLock`-guarded table idiom `cdst_core::solver::registry` uses for its
//! backend table, sharded instead of singular because this table is hot on
//! the write path too (every cache-miss populates an entry).

use cdst_core::solver::{DistanceEstimate, LatLng};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

const NUM_SHARDS: usize = 16;

/// A cache key: rounded (lat, lng) pairs for origin and destination.
pub type CacheKey = (i64, i64, i64, i64);

struct Entry {
    estimate: DistanceEstimate,
    inserted_at: Instant,
}

/// Process-wide cache of (origin, destination) -> distance/time, shared
/// across scenarios. Entries expire after `ttl` and are lazily deleted on
/// the next read or write that touches their shard.
pub struct DistanceCache {
    shards: Vec<RwLock<HashMap<CacheKey, Entry>>>,
    ttl: Duration,
}

impl DistanceCache {
    pub fn new(ttl: Duration) -> Self {
        let mut shards = Vec::with_capacity(NUM_SHARDS);
        for _ in 0..NUM_SHARDS {
            shards.push(RwLock::new(HashMap::new()));
        }
        Self { shards, ttl }
    }

    pub fn key_for(origin: LatLng, dest: LatLng) -> CacheKey {
        let (olat, olng) = origin.rounded();
        let (dlat, dlng) = dest.rounded();
        (olat, olng, dlat, dlng)
    }

    fn shard_index(key: &CacheKey) -> usize {
        // Simple, deterministic coordinate hash; doesn't need to be
        // cryptographic, just spread keys evenly across shards.
        let mut hash: u64 = 0xcbf29ce484222325;
        for part in [key.0, key.1, key.2, key.3] {
            hash ^= part as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash as usize) % NUM_SHARDS
    }

    pub fn get(&self, key: &CacheKey) -> Option<DistanceEstimate> {
        let shard = &self.shards[Self::shard_index(key)];
        let guard = shard.read().expect("distance cache shard poisoned");
        match guard.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.estimate),
            _ => None,
        }
    }

    pub fn insert(&self, key: CacheKey, estimate: DistanceEstimate) {
        let shard = &self.shards[Self::shard_index(&key)];
        let mut guard = shard.write().expect("distance cache shard poisoned");
        guard.insert(
            key,
            Entry {
                estimate,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Sweep every shard, dropping entries past their TTL. Intended to be
    /// called periodically (default every `cleanup_interval`, 6h) rather
    /// than relying solely on lazy per-read expiry.
    pub fn sweep_expired(&self) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut guard = shard.write().expect("distance cache shard poisoned");
            let before = guard.len();
            guard.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
            removed += before - guard.len();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.read().expect("distance cache shard poisoned").len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdst_core::solver::EstimateSource;

    fn sample_estimate() -> DistanceEstimate {
        DistanceEstimate {
            km: 12.5,
            minutes: 20.0,
            source: EstimateSource::Fallback,
        }
    }

    #[test]
    fn insert_then_get_round_trips() {
        let cache = DistanceCache::new(Duration::from_secs(3600));
        let key = DistanceCache::key_for(LatLng::new(1.0, 2.0), LatLng::new(3.0, 4.0));
        cache.insert(key, sample_estimate());
        assert_eq!(cache.get(&key), Some(sample_estimate()));
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = DistanceCache::new(Duration::from_millis(1));
        let key = DistanceCache::key_for(LatLng::new(1.0, 2.0), LatLng::new(3.0, 4.0));
        cache.insert(key, sample_estimate());
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn sweep_removes_expired_entries() {
        let cache = DistanceCache::new(Duration::from_millis(1));
        let key = DistanceCache::key_for(LatLng::new(1.0, 2.0), LatLng::new(3.0, 4.0));
        cache.insert(key, sample_estimate());
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.sweep_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_distribute_across_shards() {
        let mut indices = std::collections::HashSet::new();
        for i in 0..64 {
            let key = DistanceCache::key_for(
                LatLng::new(i as f64, 0.0),
                LatLng::new(0.0, i as f64),
            );
            indices.insert(DistanceCache::shard_index(&key));
        }
        assert!(indices.len() > 1, "expected keys to spread across shards");
    }
}
