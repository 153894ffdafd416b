//! Distance Provider: the single point of contact between the rest of the
//! workspace and "how far apart are two points".
//!
//! Consumed exactly once, by the Problem Builder (`cdst-scenarios`), to
//! materialize dense distance/time matrices; the solver never calls this
//! directly, so optimization itself is always cache-hot.

use crate::cache::DistanceCache;
use crate::client::RoutingClient;
use cdst_core::solver::{DistanceBackend, DistanceBackendKind, DistanceEstimate, EstimateSource, LatLng};
use rayon::ThreadPoolBuilder;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default cap on outstanding external routing requests per batch call, to
/// respect the upstream rate limit (~1000/h documented).
pub const DEFAULT_MAX_OUTSTANDING: usize = 8;

/// Default cache TTL for resolved distance estimates.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 3600);

/// Configuration for a [`Provider`].
#[derive(Clone)]
pub struct ProviderConfig {
    pub cache_ttl: Duration,
    pub max_outstanding: usize,
    /// Which registered estimator to degrade to when the routing endpoint
    /// is unavailable; defaults to haversine.
    pub fallback: DistanceBackendKind,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            max_outstanding: DEFAULT_MAX_OUTSTANDING,
            fallback: DistanceBackendKind::default(),
        }
    }
}

/// A single resolved (origin, destination) distance, with provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutedDistance {
    pub origin: LatLng,
    pub dest: LatLng,
    pub estimate: DistanceEstimate,
}

/// The Distance Provider. Owns the process-wide cache; routing client and
/// fallback backend are injected so tests can run with a fake client and no
/// network access.
pub struct Provider {
    client: Option<Arc<dyn RoutingClient>>,
    fallback: Arc<dyn DistanceBackend>,
    cache: DistanceCache,
    config: ProviderConfig,
}

impl Provider {
    /// Build a provider with an external routing client. If `client` is
    /// `None`, every call degrades straight to the haversine fallback —
    /// useful for offline runs and for scenario 6 in the test plan
    /// ("simulate a 100% timeout external router").
    pub fn new(client: Option<Arc<dyn RoutingClient>>, config: ProviderConfig) -> Self {
        Self {
            client,
            fallback: config.fallback.build(),
            cache: DistanceCache::new(config.cache_ttl),
            config,
        }
    }

    /// Resolve a single (origin, destination) pair, consulting the cache
    /// first.
    pub fn distance(&self, origin: LatLng, dest: LatLng) -> RoutedDistance {
        let key = DistanceCache::key_for(origin, dest);
        if let Some(estimate) = self.cache.get(&key) {
            return RoutedDistance {
                origin,
                dest,
                estimate,
            };
        }
        let estimate = self.resolve_one(origin, dest);
        self.cache.insert(key, estimate);
        RoutedDistance {
            origin,
            dest,
            estimate,
        }
    }

    fn resolve_one(&self, origin: LatLng, dest: LatLng) -> DistanceEstimate {
        if let Some(client) = &self.client {
            match client.route_batch(&[(origin, dest)]) {
                Ok(legs) if legs.len() == 1 => {
                    return DistanceEstimate {
                        km: legs[0].km,
                        minutes: legs[0].min,
                        source: EstimateSource::Routed,
                    };
                }
                Ok(_) => warn!("routing endpoint returned an unexpected leg count"),
                Err(err) => warn!(error = %err, "routing request failed, falling back to haversine"),
            }
        }
        self.fallback
            .estimate(origin, dest)
            .unwrap_or(DistanceEstimate {
                km: 0.0,
                minutes: 0.0,
                source: EstimateSource::Fallback,
            })
    }

    /// Resolve a batch of pairs, parallelizing cache-miss lookups across a
    /// thread pool capped at `max_outstanding` to respect the upstream rate
    /// limit.
    pub fn distance_batch(&self, pairs: &[(LatLng, LatLng)]) -> Vec<RoutedDistance> {
        use rayon::prelude::*;

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.max_outstanding.max(1))
            .build()
            .expect("building distance provider thread pool");

        pool.install(|| {
            pairs
                .par_iter()
                .map(|(origin, dest)| self.distance(*origin, *dest))
                .collect()
        })
    }

    /// Periodic maintenance: drop TTL-expired cache entries. Intended to be
    /// invoked by the scheduler's runtime on a `cleanup_interval` timer
    /// (default 6h), not on every lookup.
    pub fn sweep_cache(&self) -> usize {
        self.cache.sweep_expired()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RoutedLeg;
    use anyhow::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AlwaysFailsClient;
    impl RoutingClient for AlwaysFailsClient {
        fn route_batch(&self, _pairs: &[(LatLng, LatLng)]) -> Result<Vec<RoutedLeg>> {
            Err(anyhow::anyhow!("simulated timeout"))
        }
    }

    struct CountingClient {
        calls: AtomicUsize,
    }
    impl RoutingClient for CountingClient {
        fn route_batch(&self, pairs: &[(LatLng, LatLng)]) -> Result<Vec<RoutedLeg>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(pairs.iter().map(|_| RoutedLeg { km: 1.0, min: 2.0 }).collect())
        }
    }

    #[test]
    fn no_client_falls_back_to_haversine() {
        let provider = Provider::new(None, ProviderConfig::default());
        let result = provider.distance(LatLng::new(0.0, 0.0), LatLng::new(0.0, 1.0));
        assert_eq!(result.estimate.source, EstimateSource::Fallback);
        assert!(result.estimate.km > 0.0);
    }

    #[test]
    fn failing_client_degrades_to_fallback_without_panicking() {
        let provider = Provider::new(Some(Arc::new(AlwaysFailsClient)), ProviderConfig::default());
        let result = provider.distance(LatLng::new(10.0, 10.0), LatLng::new(11.0, 11.0));
        assert_eq!(result.estimate.source, EstimateSource::Fallback);
    }

    #[test]
    fn successful_client_is_marked_routed() {
        let provider = Provider::new(
            Some(Arc::new(CountingClient {
                calls: AtomicUsize::new(0),
            })),
            ProviderConfig::default(),
        );
        let result = provider.distance(LatLng::new(1.0, 1.0), LatLng::new(2.0, 2.0));
        assert_eq!(result.estimate.source, EstimateSource::Routed);
        assert_eq!(result.estimate.km, 1.0);
    }

    #[test]
    fn repeated_lookup_hits_cache_not_client() {
        let client = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
        });
        let provider = Provider::new(Some(client.clone()), ProviderConfig::default());
        let o = LatLng::new(5.0, 5.0);
        let d = LatLng::new(6.0, 6.0);
        provider.distance(o, d);
        provider.distance(o, d);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn batch_resolves_all_pairs() {
        let provider = Provider::new(None, ProviderConfig::default());
        let pairs = vec![
            (LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)),
            (LatLng::new(2.0, 2.0), LatLng::new(3.0, 3.0)),
        ];
        let results = provider.distance_batch(&pairs);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.estimate.km > 0.0));
    }
}
