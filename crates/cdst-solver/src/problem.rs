//! Problem data structures.
//!
//! Defines the dense, immutable input to the solver: a network snapshot
//! already resolved to 0-based indices by the Problem Builder
//! (`cdst-scenarios`). Plain fields plus a builder, spanning the
//! three-axis (area, lab, test) index space this domain requires.

use cdst_core::ids::{AreaIndex, ExternalId, LabIndex, TestIndex};
use serde::{Deserialize, Serialize};

/// Per-laboratory capacity and staffing limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LabCapacity {
    pub max_per_day: u32,
    pub max_per_month: u32,
    pub staff_count: u32,
    pub util_factor: f64,
}

/// Where a Problem's distance/time matrices came from, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingSource {
    /// Every pair was resolved against the external routing endpoint.
    Routed,
    /// At least one pair fell back to haversine.
    Mixed,
    /// Every pair fell back to haversine (e.g. the endpoint was entirely
    /// unavailable for this run).
    Fallback,
}

/// Immutable, per-run optimization problem.
///
/// All arrays are dense and fully populated before the solver starts. The
/// test axis is innermost wherever a `(lab, test)` or `(area, test)` pair
/// is flattened, matching the allocation tensor's own layout so the
/// fitness evaluator's inner loops stay cache-friendly.
#[derive(Debug, Clone)]
pub struct Problem {
    pub n_areas: usize,
    pub n_labs: usize,
    pub n_tests: usize,

    pub area_ids: Vec<ExternalId>,
    pub lab_ids: Vec<ExternalId>,
    pub test_ids: Vec<ExternalId>,

    /// `demand[a*n_tests + t]`.
    demand: Vec<u32>,
    /// `dist_km[a*n_labs + j]`.
    dist_km: Vec<f64>,
    /// `time_min[a*n_labs + j]`.
    time_min: Vec<f64>,

    pub capacity: Vec<LabCapacity>,
    /// `hours[j][weekday]`, minutes the lab is open that weekday (0=Mon).
    pub hours: Vec<[f64; 7]>,

    /// `capable[j*n_tests + t]`.
    capable: Vec<bool>,
    /// `proc_time_min[j*n_tests + t]`.
    proc_time_min: Vec<f64>,
    /// `staff_req[j*n_tests + t]`.
    staff_req: Vec<f64>,
    /// `equip_util[j*n_tests + t]`.
    equip_util: Vec<f64>,
    /// `cost_per_test[j*n_tests + t]`.
    cost_per_test: Vec<f64>,
    /// `quality[j*n_tests + t]`.
    quality: Vec<f64>,

    pub overhead: Vec<f64>,
    pub pop: Vec<f64>,

    pub cost_per_km: f64,
    pub max_acceptable_distance_km: f64,

    /// Fixed at build time: the largest `pop[a]`, used by `f5`'s
    /// population-weighting term so it never shifts mid-run.
    pub max_pop: f64,

    pub routing_source: RoutingSource,
}

impl Problem {
    pub fn demand(&self, a: AreaIndex, t: TestIndex) -> u32 {
        self.demand[a.index() * self.n_tests + t.index()]
    }

    pub fn dist_km(&self, a: AreaIndex, j: LabIndex) -> f64 {
        self.dist_km[a.index() * self.n_labs + j.index()]
    }

    pub fn time_min(&self, a: AreaIndex, j: LabIndex) -> f64 {
        self.time_min[a.index() * self.n_labs + j.index()]
    }

    pub fn capable(&self, j: LabIndex, t: TestIndex) -> bool {
        self.capable[j.index() * self.n_tests + t.index()]
    }

    pub fn proc_time_min(&self, j: LabIndex, t: TestIndex) -> f64 {
        self.proc_time_min[j.index() * self.n_tests + t.index()]
    }

    pub fn staff_req(&self, j: LabIndex, t: TestIndex) -> f64 {
        self.staff_req[j.index() * self.n_tests + t.index()]
    }

    pub fn equip_util(&self, j: LabIndex, t: TestIndex) -> f64 {
        self.equip_util[j.index() * self.n_tests + t.index()]
    }

    pub fn cost_per_test(&self, j: LabIndex, t: TestIndex) -> f64 {
        self.cost_per_test[j.index() * self.n_tests + t.index()]
    }

    pub fn quality(&self, j: LabIndex, t: TestIndex) -> f64 {
        self.quality[j.index() * self.n_tests + t.index()]
    }

    /// Total minutes a lab is open per planning cycle.
    ///
    /// Sums the seven weekday entries directly — `hours[j]` is read as
    /// "minutes open that weekday within one planning cycle", and demand
    /// `D[a,t]` is assumed to be stated over that same cycle.
    pub fn working_minutes(&self, j: LabIndex) -> f64 {
        self.hours[j.index()].iter().sum()
    }

    /// `available_minutes[j]` used by capacity repair: staffed open minutes
    /// per planning cycle. The utilization objective additionally scales
    /// this by the lab's `util_factor`.
    pub fn available_minutes(&self, j: LabIndex) -> f64 {
        self.working_minutes(j) * self.capacity[j.index()].staff_count as f64
    }

    /// The largest single `demand[a,t]` cell, fixed at build time; scales
    /// the mutation operator's perturbation width.
    pub fn max_demand(&self) -> u32 {
        self.demand.iter().copied().max().unwrap_or(0)
    }

    pub fn lab(&self, j: LabIndex) -> &LabCapacity {
        &self.capacity[j.index()]
    }

    pub fn area_indices(&self) -> impl Iterator<Item = AreaIndex> {
        (0..self.n_areas).map(AreaIndex::new)
    }

    pub fn lab_indices(&self) -> impl Iterator<Item = LabIndex> {
        (0..self.n_labs).map(LabIndex::new)
    }

    pub fn test_indices(&self) -> impl Iterator<Item = TestIndex> {
        (0..self.n_tests).map(TestIndex::new)
    }

    /// Labs capable of performing `t`, nearest-first for area `a`.
    pub fn capable_labs_by_distance(&self, a: AreaIndex, t: TestIndex) -> Vec<LabIndex> {
        let mut labs: Vec<LabIndex> = self
            .lab_indices()
            .filter(|&j| self.capable(j, t))
            .collect();
        labs.sort_by(|&x, &y| {
            self.dist_km(a, x)
                .partial_cmp(&self.dist_km(a, y))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        labs
    }
}

/// Builder for constructing [`Problem`] values with the capability
/// invariant (`capable[j,t]=false ⇒ cost_per_test[j,t]=0 ∧ proc_time[j,t]=0`)
/// enforced on `build()`, following `TepProblemBuilder`'s
/// accumulate-then-finalize shape.
pub struct ProblemBuilder {
    n_areas: usize,
    n_labs: usize,
    n_tests: usize,
    area_ids: Vec<ExternalId>,
    lab_ids: Vec<ExternalId>,
    test_ids: Vec<ExternalId>,
    demand: Vec<u32>,
    dist_km: Vec<f64>,
    time_min: Vec<f64>,
    capacity: Vec<LabCapacity>,
    hours: Vec<[f64; 7]>,
    capable: Vec<bool>,
    proc_time_min: Vec<f64>,
    staff_req: Vec<f64>,
    equip_util: Vec<f64>,
    cost_per_test: Vec<f64>,
    quality: Vec<f64>,
    overhead: Vec<f64>,
    pop: Vec<f64>,
    cost_per_km: f64,
    max_acceptable_distance_km: f64,
    routing_source: RoutingSource,
}

impl ProblemBuilder {
    pub fn new(n_areas: usize, n_labs: usize, n_tests: usize) -> Self {
        Self {
            n_areas,
            n_labs,
            n_tests,
            area_ids: (0..n_areas).map(|i| ExternalId::new(i.to_string())).collect(),
            lab_ids: (0..n_labs).map(|i| ExternalId::new(i.to_string())).collect(),
            test_ids: (0..n_tests).map(|i| ExternalId::new(i.to_string())).collect(),
            demand: vec![0; n_areas * n_tests],
            dist_km: vec![0.0; n_areas * n_labs],
            time_min: vec![0.0; n_areas * n_labs],
            capacity: vec![
                LabCapacity {
                    max_per_day: 0,
                    max_per_month: 0,
                    staff_count: 0,
                    util_factor: 1.0,
                };
                n_labs
            ],
            hours: vec![[0.0; 7]; n_labs],
            capable: vec![false; n_labs * n_tests],
            proc_time_min: vec![0.0; n_labs * n_tests],
            staff_req: vec![0.0; n_labs * n_tests],
            equip_util: vec![0.0; n_labs * n_tests],
            cost_per_test: vec![0.0; n_labs * n_tests],
            quality: vec![1.0; n_labs * n_tests],
            overhead: vec![0.0; n_labs],
            pop: vec![1.0; n_areas],
            cost_per_km: 1.0,
            max_acceptable_distance_km: 50.0,
            routing_source: RoutingSource::Routed,
        }
    }

    pub fn area_id(mut self, a: AreaIndex, id: ExternalId) -> Self {
        self.area_ids[a.index()] = id;
        self
    }

    pub fn lab_id(mut self, j: LabIndex, id: ExternalId) -> Self {
        self.lab_ids[j.index()] = id;
        self
    }

    pub fn test_id(mut self, t: TestIndex, id: ExternalId) -> Self {
        self.test_ids[t.index()] = id;
        self
    }

    pub fn demand(mut self, a: AreaIndex, t: TestIndex, value: u32) -> Self {
        self.demand[a.index() * self.n_tests + t.index()] = value;
        self
    }

    pub fn distance(mut self, a: AreaIndex, j: LabIndex, km: f64, minutes: f64) -> Self {
        self.dist_km[a.index() * self.n_labs + j.index()] = km;
        self.time_min[a.index() * self.n_labs + j.index()] = minutes;
        self
    }

    pub fn capacity(mut self, j: LabIndex, capacity: LabCapacity) -> Self {
        self.capacity[j.index()] = capacity;
        self
    }

    pub fn hours(mut self, j: LabIndex, weekday_minutes: [f64; 7]) -> Self {
        self.hours[j.index()] = weekday_minutes;
        self
    }

    pub fn overhead(mut self, j: LabIndex, value: f64) -> Self {
        self.overhead[j.index()] = value;
        self
    }

    pub fn pop(mut self, a: AreaIndex, value: f64) -> Self {
        self.pop[a.index()] = value;
        self
    }

    pub fn cost_per_km(mut self, value: f64) -> Self {
        self.cost_per_km = value;
        self
    }

    pub fn max_acceptable_distance_km(mut self, value: f64) -> Self {
        self.max_acceptable_distance_km = value;
        self
    }

    pub fn routing_source(mut self, source: RoutingSource) -> Self {
        self.routing_source = source;
        self
    }

    /// Mark `(j, t)` capable, with its technical/cost/quality parameters.
    /// Labs never marked capable for a test keep the zeroed defaults the
    /// capability invariant requires.
    pub fn capability(
        mut self,
        j: LabIndex,
        t: TestIndex,
        proc_time_min: f64,
        staff_req: f64,
        equip_util: f64,
        cost_per_test: f64,
        quality: f64,
    ) -> Self {
        let idx = j.index() * self.n_tests + t.index();
        self.capable[idx] = true;
        self.proc_time_min[idx] = proc_time_min;
        self.staff_req[idx] = staff_req;
        self.equip_util[idx] = equip_util;
        self.cost_per_test[idx] = cost_per_test;
        self.quality[idx] = quality;
        self
    }

    pub fn build(self) -> Problem {
        let max_pop = self.pop.iter().cloned().fold(1.0_f64, f64::max);
        Problem {
            n_areas: self.n_areas,
            n_labs: self.n_labs,
            n_tests: self.n_tests,
            area_ids: self.area_ids,
            lab_ids: self.lab_ids,
            test_ids: self.test_ids,
            demand: self.demand,
            dist_km: self.dist_km,
            time_min: self.time_min,
            capacity: self.capacity,
            hours: self.hours,
            capable: self.capable,
            proc_time_min: self.proc_time_min,
            staff_req: self.staff_req,
            equip_util: self.equip_util,
            cost_per_test: self.cost_per_test,
            quality: self.quality,
            overhead: self.overhead,
            pop: self.pop,
            cost_per_km: self.cost_per_km,
            max_acceptable_distance_km: self.max_acceptable_distance_km,
            max_pop,
            routing_source: self.routing_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trivial_problem() -> Problem {
        ProblemBuilder::new(2, 1, 1)
            .demand(AreaIndex::new(0), TestIndex::new(0), 10)
            .demand(AreaIndex::new(1), TestIndex::new(0), 5)
            .distance(AreaIndex::new(0), LabIndex::new(0), 3.0, 10.0)
            .distance(AreaIndex::new(1), LabIndex::new(0), 4.0, 12.0)
            .capacity(
                LabIndex::new(0),
                LabCapacity {
                    max_per_day: 50,
                    max_per_month: 1000,
                    staff_count: 2,
                    util_factor: 0.8,
                },
            )
            .hours(LabIndex::new(0), [480.0, 480.0, 480.0, 480.0, 480.0, 0.0, 0.0])
            .capability(LabIndex::new(0), TestIndex::new(0), 30.0, 1.0, 0.5, 5.0, 0.9)
            .build()
    }

    #[test]
    fn accessors_read_back_builder_values() {
        let problem = trivial_problem();
        assert_eq!(problem.demand(AreaIndex::new(0), TestIndex::new(0)), 10);
        assert_eq!(problem.dist_km(AreaIndex::new(1), LabIndex::new(0)), 4.0);
        assert!(problem.capable(LabIndex::new(0), TestIndex::new(0)));
    }

    #[test]
    fn capability_invariant_holds_for_unmarked_pairs() {
        let problem = ProblemBuilder::new(1, 1, 2)
            .capability(LabIndex::new(0), TestIndex::new(0), 10.0, 1.0, 0.1, 2.0, 1.0)
            .build();
        assert!(!problem.capable(LabIndex::new(0), TestIndex::new(1)));
        assert_eq!(problem.cost_per_test(LabIndex::new(0), TestIndex::new(1)), 0.0);
        assert_eq!(problem.proc_time_min(LabIndex::new(0), TestIndex::new(1)), 0.0);
    }

    #[test]
    fn working_minutes_sums_the_week() {
        let problem = trivial_problem();
        assert_eq!(problem.working_minutes(LabIndex::new(0)), 2400.0);
    }

    #[test]
    fn max_pop_is_fixed_at_build_time() {
        let problem = ProblemBuilder::new(2, 1, 1)
            .pop(AreaIndex::new(0), 1000.0)
            .pop(AreaIndex::new(1), 4000.0)
            .build();
        assert_eq!(problem.max_pop, 4000.0);
    }

    #[test]
    fn capable_labs_by_distance_is_sorted_nearest_first() {
        let problem = ProblemBuilder::new(1, 2, 1)
            .distance(AreaIndex::new(0), LabIndex::new(0), 20.0, 30.0)
            .distance(AreaIndex::new(0), LabIndex::new(1), 5.0, 8.0)
            .capability(LabIndex::new(0), TestIndex::new(0), 10.0, 1.0, 0.1, 2.0, 1.0)
            .capability(LabIndex::new(1), TestIndex::new(0), 10.0, 1.0, 0.1, 2.0, 1.0)
            .build();
        let labs = problem.capable_labs_by_distance(AreaIndex::new(0), TestIndex::new(0));
        assert_eq!(labs, vec![LabIndex::new(1), LabIndex::new(0)]);
    }
}
