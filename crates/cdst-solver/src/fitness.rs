//! Fitness Evaluator: turns an allocation into five raw objectives plus a
//! soft-constraint penalty and a weighted composite scalar.

use crate::allocation::{AllocationTensor, Fitness, Objectives};
use crate::parameters::Parameters;
use crate::problem::Problem;
use cdst_core::ids::{AreaIndex, LabIndex, TestIndex};
use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;
use tracing::warn;

/// Bound on the number of distinct allocations the evaluator will memoize
/// within one run. Elitism and repair converge populations onto repeated
/// allocations, so hits are common; the cap keeps a long stalled run from
/// growing the table without limit.
const CACHE_CAPACITY: usize = 100_000;

/// Evaluates objectives for one [`Problem`], with a small content-hash
/// cache so repair/elitism copies of an already-scored individual don't
/// redo the O(areas·labs·tests) walk.
pub struct FitnessEvaluator<'p> {
    problem: &'p Problem,
    parameters: Parameters,
    cache: RwLock<lru::LruCache<u64, (Objectives, f64)>>,
}

/// Per-generation min/max for each of the five objectives, used to
/// normalize raw objective values into `[0, 1]` before they're weighted
/// into the composite scalar. Computed fresh from whatever batch of
/// individuals is being scored together, so the composite always reflects
/// that batch's actual spread rather than some fixed, possibly-stale scale.
#[derive(Debug, Clone, Copy)]
struct ObjectiveRanges {
    min: [f64; 5],
    max: [f64; 5],
}

impl ObjectiveRanges {
    fn from_objectives<'a>(objectives: impl Iterator<Item = &'a Objectives>) -> Self {
        let mut min = [f64::INFINITY; 5];
        let mut max = [f64::NEG_INFINITY; 5];
        for obj in objectives {
            for (i, value) in obj.as_array().iter().enumerate() {
                min[i] = min[i].min(*value);
                max[i] = max[i].max(*value);
            }
        }
        for i in 0..5 {
            if !min[i].is_finite() {
                min[i] = 0.0;
            }
            if !max[i].is_finite() {
                max[i] = 0.0;
            }
        }
        Self { min, max }
    }

    /// A single allocation scored with no batch context normalizes to the
    /// midpoint of its own (zero-width) range: neither an improvement nor
    /// a regression relative to anything, since there is nothing to
    /// compare against.
    fn degenerate(objectives: &Objectives) -> Self {
        let values = objectives.as_array();
        Self { min: values, max: values }
    }

    fn normalize(&self, index: usize, value: f64) -> f64 {
        let span = self.max[index] - self.min[index];
        if span.abs() < 1e-12 {
            0.5
        } else {
            ((value - self.min[index]) / span).clamp(0.0, 1.0)
        }
    }
}

mod lru {
    //! Minimal insertion-order-evicting cache. Not exposed outside this
    //! module; a dependency the size of a full LRU crate isn't warranted
    //! for a single fixed-capacity memoization table.
    use std::collections::HashMap;

    pub struct LruCache<K, V> {
        capacity: usize,
        order: Vec<K>,
        map: HashMap<K, V>,
    }

    impl<K: Eq + std::hash::Hash + Clone, V: Clone> LruCache<K, V> {
        pub fn new(capacity: usize) -> Self {
            Self {
                capacity,
                order: Vec::new(),
                map: HashMap::new(),
            }
        }

        pub fn get(&self, key: &K) -> Option<V> {
            self.map.get(key).cloned()
        }

        pub fn insert(&mut self, key: K, value: V) {
            if !self.map.contains_key(&key) {
                if self.order.len() >= self.capacity {
                    let oldest = self.order.remove(0);
                    self.map.remove(&oldest);
                }
                self.order.push(key.clone());
            }
            self.map.insert(key, value);
        }

        pub fn len(&self) -> usize {
            self.map.len()
        }
    }
}

fn hash_allocation(allocation: &AllocationTensor) -> u64 {
    let mut hasher = DefaultHasher::new();
    allocation.cells().hash(&mut hasher);
    hasher.finish()
}

/// Raw equipment-minutes load on lab `j` divided by its staffed,
/// utilization-scaled open minutes.
pub fn lab_utilization_ratio(problem: &Problem, allocation: &AllocationTensor, j: LabIndex) -> f64 {
    let available = problem.available_minutes(j) * problem.lab(j).util_factor;
    if available <= 0.0 {
        return 0.0;
    }
    allocation.lab_minutes(j, |j, t| problem.proc_time_min(j, t)) / available
}

/// Piecewise utilization score: underused labs earn half credit, the
/// `[0.3, 0.9]` band earns full credit, and overloaded labs are docked
/// twice the overage past 0.9.
pub fn utilization_score(u: f64) -> f64 {
    if u < 0.3 {
        u / 2.0
    } else if u <= 0.9 {
        u
    } else {
        0.9 - 2.0 * (u - 0.9)
    }
}

/// Accessibility score for one area: 40% proximity to the nearest lab it
/// actually sends tests to (relative to the acceptable-distance cap), 30%
/// population weight on a log scale, 30% share of test types it has any
/// allocation for.
pub fn area_accessibility(problem: &Problem, allocation: &AllocationTensor, a: AreaIndex) -> f64 {
    let mut d_min = f64::INFINITY;
    let mut tests_served = 0usize;
    for t in problem.test_indices() {
        let mut any = false;
        for j in problem.lab_indices() {
            if allocation.get(a, j, t) > 0 {
                any = true;
                d_min = d_min.min(problem.dist_km(a, j));
            }
        }
        if any {
            tests_served += 1;
        }
    }

    let proximity = if d_min.is_finite() && problem.max_acceptable_distance_km > 0.0 {
        (1.0 - d_min / problem.max_acceptable_distance_km).max(0.0)
    } else {
        0.0
    };
    let pop_weight = if problem.max_pop > 1.0 {
        (problem.pop[a.index()].max(1.0).ln() / problem.max_pop.ln()).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let coverage = if problem.n_tests > 0 {
        tests_served as f64 / problem.n_tests as f64
    } else {
        0.0
    };
    0.4 * proximity + 0.3 * pop_weight + 0.3 * coverage
}

impl<'p> FitnessEvaluator<'p> {
    pub fn new(problem: &'p Problem, parameters: Parameters) -> Self {
        Self {
            problem,
            parameters,
            cache: RwLock::new(lru::LruCache::new(CACHE_CAPACITY)),
        }
    }

    /// Score one allocation with no population context to normalize
    /// against. Used by callers that need a single allocation's raw
    /// objectives/penalty outside a generational run (tests, result
    /// decoration); prefer [`Self::evaluate_batch`] when scoring a whole
    /// population so the composite reflects that population's spread.
    pub fn evaluate(&self, allocation: &AllocationTensor) -> Fitness {
        let (objectives, penalty) = self.raw(allocation);
        let ranges = ObjectiveRanges::degenerate(&objectives);
        Fitness {
            objectives,
            penalty,
            composite: self.composite(&objectives, penalty, &ranges),
        }
    }

    /// Score a whole generation: raw objectives are computed in parallel
    /// and memoized per-allocation, then the composite for each individual
    /// is normalized against this batch's own min/max per objective —
    /// the population-relative normalization the weighted composite `F`
    /// requires.
    pub fn evaluate_batch(&self, allocations: &[AllocationTensor]) -> Vec<Fitness> {
        let raw: Vec<(Objectives, f64)> = allocations.par_iter().map(|a| self.raw(a)).collect();
        let ranges = ObjectiveRanges::from_objectives(raw.iter().map(|(o, _)| o));
        raw.into_iter()
            .map(|(objectives, penalty)| Fitness {
                objectives,
                penalty,
                composite: self.composite(&objectives, penalty, &ranges),
            })
            .collect()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().expect("fitness cache poisoned").len()
    }

    /// Recompute every composite against the min/max spread of this batch.
    /// The generational loop calls this over the union of parents and
    /// offspring before survivor selection, so elitism never compares
    /// composites normalized against two different populations.
    pub fn renormalize(&self, fitnesses: &mut [Fitness]) {
        let ranges = ObjectiveRanges::from_objectives(fitnesses.iter().map(|f| &f.objectives));
        for fitness in fitnesses.iter_mut() {
            fitness.composite = self.composite(&fitness.objectives, fitness.penalty, &ranges);
        }
    }

    fn composite(&self, objectives: &Objectives, penalty: f64, ranges: &ObjectiveRanges) -> f64 {
        let weights = self.parameters.weights.as_array();
        objectives
            .as_array()
            .iter()
            .enumerate()
            .map(|(i, value)| weights[i] * ranges.normalize(i, *value))
            .sum::<f64>()
            + self.parameters.penalty_weight * penalty
    }

    /// Raw, population-independent objectives and penalty for one
    /// allocation, consulting the memoization cache first.
    fn raw(&self, allocation: &AllocationTensor) -> (Objectives, f64) {
        let key = hash_allocation(allocation);
        if let Some(hit) = self.cache.read().expect("fitness cache poisoned").get(&key) {
            return hit;
        }
        let raw = self.evaluate_uncached(allocation);
        self.cache
            .write()
            .expect("fitness cache poisoned")
            .insert(key, raw);
        raw
    }

    fn evaluate_uncached(&self, allocation: &AllocationTensor) -> (Objectives, f64) {
        let objectives = Objectives {
            f1_distance: self.f1_distance(allocation),
            f2_time: self.f2_time(allocation),
            f3_cost: self.f3_cost(allocation),
            f4_utilization: self.f4_utilization(allocation),
            f5_accessibility: self.f5_accessibility(allocation),
        };
        let penalty = self.penalty(allocation);
        if objectives.as_array().iter().any(|v| !v.is_finite()) || !penalty.is_finite() {
            // An individual that evaluates to garbage is penalized out of
            // contention, not allowed to abort the run.
            warn!("allocation evaluated to a non-finite objective, penalizing");
            return (objectives, f64::INFINITY);
        }
        (objectives, penalty)
    }

    /// `f1`: population-weighted average distance traveled per test.
    fn f1_distance(&self, allocation: &AllocationTensor) -> f64 {
        let (weighted, total) = self.accumulate(allocation, |p, a, j, _, count| {
            count as f64 * p.dist_km(a, j)
        });
        if total > 0.0 {
            weighted / total
        } else {
            0.0
        }
    }

    /// `f2`: population-weighted average of travel time plus processing
    /// time per test — the total elapsed time a test actually costs, not
    /// just the part spent getting the sample to the lab.
    fn f2_time(&self, allocation: &AllocationTensor) -> f64 {
        let (weighted, total) = self.accumulate(allocation, |p, a, j, t, count| {
            count as f64 * (p.time_min(a, j) + p.proc_time_min(j, t))
        });
        if total > 0.0 {
            weighted / total
        } else {
            0.0
        }
    }

    /// `f3`: total cost per test routed — transport, processing, and a
    /// per-unit share of the receiving lab's fixed overhead (amortized
    /// against its monthly capacity), all weighted by the allocated count.
    /// A lab allocated nothing contributes nothing.
    fn f3_cost(&self, allocation: &AllocationTensor) -> f64 {
        let mut total = 0.0;
        for a in self.problem.area_indices() {
            for j in self.problem.lab_indices() {
                let overhead_per_test =
                    self.problem.overhead[j.index()] / self.problem.lab(j).max_per_month.max(1) as f64;
                for t in self.problem.test_indices() {
                    let count = allocation.get(a, j, t);
                    if count > 0 {
                        total += count as f64
                            * (self.problem.cost_per_test(j, t)
                                + self.problem.dist_km(a, j) * self.problem.cost_per_km
                                + overhead_per_test);
                    }
                }
            }
        }
        total
    }

    /// `f4`: negated mean utilization score across labs, so that — like
    /// every other objective — smaller is better. The score itself rewards
    /// the `[0.3, 0.9]` band and punishes both idle and overloaded labs.
    fn f4_utilization(&self, allocation: &AllocationTensor) -> f64 {
        let mut sum = 0.0;
        let mut counted = 0usize;
        for j in self.problem.lab_indices() {
            if self.problem.available_minutes(j) * self.problem.lab(j).util_factor <= 0.0 {
                continue;
            }
            sum += utilization_score(lab_utilization_ratio(self.problem, allocation, j));
            counted += 1;
        }
        if counted > 0 {
            -(sum / counted as f64)
        } else {
            0.0
        }
    }

    /// `f5`: negated mean accessibility score across areas (see
    /// [`area_accessibility`]), again negated so every objective minimizes.
    fn f5_accessibility(&self, allocation: &AllocationTensor) -> f64 {
        if self.problem.n_areas == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .problem
            .area_indices()
            .map(|a| area_accessibility(self.problem, allocation, a))
            .sum();
        -(sum / self.problem.n_areas as f64)
    }

    /// Soft-constraint penalty: quadratic, threshold-normalized overage
    /// terms for distance and travel time (so a cell twice over its cap
    /// hurts four times as much, not twice), a linear shortfall term for
    /// quality dipping below the floor, a quadratic term for lab
    /// utilization straying outside its target band, plus the
    /// demand-coverage and capacity-overage terms repair is meant to
    /// clean up but doesn't always fully reach.
    fn penalty(&self, allocation: &AllocationTensor) -> f64 {
        const DISTANCE_LAMBDA: f64 = 1.0;
        const TIME_LAMBDA: f64 = 1.0;
        const QUALITY_LAMBDA: f64 = 1.0;
        const UTILIZATION_LAMBDA: f64 = 1.0;
        const SHORTFALL_LAMBDA: f64 = 10.0;
        const OVER_CAPACITY_LAMBDA: f64 = 5.0;

        let mut penalty = 0.0;
        let constraints = &self.parameters.constraints;

        for a in self.problem.area_indices() {
            for j in self.problem.lab_indices() {
                let dist_excess = self.problem.dist_km(a, j) - constraints.max_travel_distance_km;
                let time_excess = self.problem.time_min(a, j) - constraints.max_travel_time_minutes;
                if dist_excess <= 0.0 && time_excess <= 0.0 {
                    continue;
                }
                let dist_term = if dist_excess > 0.0 && constraints.max_travel_distance_km > 0.0 {
                    DISTANCE_LAMBDA * (dist_excess / constraints.max_travel_distance_km).powi(2)
                } else {
                    0.0
                };
                let time_term = if time_excess > 0.0 && constraints.max_travel_time_minutes > 0.0 {
                    TIME_LAMBDA * (time_excess / constraints.max_travel_time_minutes).powi(2)
                } else {
                    0.0
                };
                for t in self.problem.test_indices() {
                    let count = allocation.get(a, j, t);
                    if count > 0 {
                        penalty += count as f64 * (dist_term + time_term);
                    }
                }
            }
        }

        for j in self.problem.lab_indices() {
            for t in self.problem.test_indices() {
                let quality = self.problem.quality(j, t);
                if quality >= constraints.min_quality {
                    continue;
                }
                let shortfall = constraints.min_quality - quality;
                for a in self.problem.area_indices() {
                    let count = allocation.get(a, j, t);
                    if count > 0 {
                        penalty += count as f64 * QUALITY_LAMBDA * shortfall;
                    }
                }
            }
        }

        for j in self.problem.lab_indices() {
            let available = self.problem.available_minutes(j) * self.problem.lab(j).util_factor;
            if available <= 0.0 {
                continue;
            }
            let utilization = lab_utilization_ratio(self.problem, allocation, j);
            if utilization <= 0.0 {
                continue;
            }
            let violation = if utilization < constraints.min_util {
                constraints.min_util - utilization
            } else if utilization > constraints.max_util {
                utilization - constraints.max_util
            } else {
                0.0
            };
            if violation > 0.0 {
                penalty += UTILIZATION_LAMBDA * violation.powi(2);
            }
        }

        for a in self.problem.area_indices() {
            for t in self.problem.test_indices() {
                let demand = self.problem.demand(a, t) as f64;
                if demand <= 0.0 {
                    continue;
                }
                let covered = allocation.area_test_total(a, t) as f64;
                let shortfall = (demand * constraints.min_coverage_fraction - covered).max(0.0);
                penalty += shortfall * SHORTFALL_LAMBDA;
            }
        }

        for j in self.problem.lab_indices() {
            let available = self.problem.available_minutes(j);
            let used = allocation.lab_minutes(j, |j, t| self.problem.proc_time_min(j, t));
            if used > available {
                penalty += (used - available) * OVER_CAPACITY_LAMBDA;
            }
            let staff_used =
                allocation.lab_minutes(j, |j, t| self.problem.proc_time_min(j, t) * self.problem.staff_req(j, t));
            if staff_used > available {
                penalty += (staff_used - available) * OVER_CAPACITY_LAMBDA;
            }
        }

        penalty
    }

    /// Shared accumulation helper for the per-pair weighted sums `f1`/`f2`
    /// need: `Σ weight(a,j) over nonzero cells, Σ count over nonzero cells`.
    fn accumulate(
        &self,
        allocation: &AllocationTensor,
        weight: impl Fn(&Problem, AreaIndex, LabIndex, TestIndex, u32) -> f64,
    ) -> (f64, f64) {
        let mut weighted = 0.0;
        let mut total = 0.0;
        for (a, j, t, count) in allocation.iter_nonzero() {
            weighted += weight(self.problem, a, j, t, count);
            total += count as f64;
        }
        (weighted, total)
    }
}
