//! The allocation tensor and the per-individual wrapper NSGA-II evolves.

use cdst_core::ids::{AreaIndex, LabIndex, TestIndex};
use serde::{Deserialize, Serialize};

/// Dense `x[area, lab, test]` allocation counts, row-major with the test
/// axis innermost: fitness evaluation walks `(area, lab)` pairs and sums
/// over tests, so the innermost axis is the one read contiguously in that
/// inner loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationTensor {
    n_areas: usize,
    n_labs: usize,
    n_tests: usize,
    cells: Vec<u32>,
}

impl AllocationTensor {
    pub fn zeros(n_areas: usize, n_labs: usize, n_tests: usize) -> Self {
        Self {
            n_areas,
            n_labs,
            n_tests,
            cells: vec![0; n_areas * n_labs * n_tests],
        }
    }

    #[inline]
    fn idx(&self, a: AreaIndex, j: LabIndex, t: TestIndex) -> usize {
        (a.index() * self.n_labs + j.index()) * self.n_tests + t.index()
    }

    #[inline]
    pub fn get(&self, a: AreaIndex, j: LabIndex, t: TestIndex) -> u32 {
        self.cells[self.idx(a, j, t)]
    }

    #[inline]
    pub fn set(&mut self, a: AreaIndex, j: LabIndex, t: TestIndex, value: u32) {
        let idx = self.idx(a, j, t);
        self.cells[idx] = value;
    }

    /// `Σ_j x[a,j,t]` — total tests of kind `t` area `a` sends anywhere.
    pub fn area_test_total(&self, a: AreaIndex, t: TestIndex) -> u32 {
        (0..self.n_labs)
            .map(|j| self.get(a, LabIndex::new(j), t))
            .sum()
    }

    /// `Σ_{a,t} x[a,j,t] · proc_time[j,t]` restricted to one lab — the raw
    /// minutes a lab is loaded with under this allocation.
    pub fn lab_minutes(&self, j: LabIndex, proc_time: impl Fn(LabIndex, TestIndex) -> f64) -> f64 {
        let mut total = 0.0;
        for a in 0..self.n_areas {
            for t in 0..self.n_tests {
                let t = TestIndex::new(t);
                let count = self.get(AreaIndex::new(a), j, t);
                if count > 0 {
                    total += count as f64 * proc_time(j, t);
                }
            }
        }
        total
    }

    pub fn n_areas(&self) -> usize {
        self.n_areas
    }

    pub fn n_labs(&self) -> usize {
        self.n_labs
    }

    pub fn n_tests(&self) -> usize {
        self.n_tests
    }

    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [u32] {
        &mut self.cells
    }

    pub fn iter_nonzero(&self) -> impl Iterator<Item = (AreaIndex, LabIndex, TestIndex, u32)> + '_ {
        let n_labs = self.n_labs;
        let n_tests = self.n_tests;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 0)
            .map(move |(flat, &v)| {
                let a = flat / (n_labs * n_tests);
                let rem = flat % (n_labs * n_tests);
                let j = rem / n_tests;
                let t = rem % n_tests;
                (AreaIndex::new(a), LabIndex::new(j), TestIndex::new(t), v)
            })
    }
}

/// The five raw objective values (`f1..f5`), before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objectives {
    pub f1_distance: f64,
    pub f2_time: f64,
    pub f3_cost: f64,
    pub f4_utilization: f64,
    pub f5_accessibility: f64,
}

impl Objectives {
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.f1_distance,
            self.f2_time,
            self.f3_cost,
            self.f4_utilization,
            self.f5_accessibility,
        ]
    }
}

/// Cached fitness for one individual: the raw objectives, the soft
/// constraint penalty, and the composite weighted scalar `F`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fitness {
    pub objectives: Objectives,
    pub penalty: f64,
    pub composite: f64,
}

/// One member of the population: an allocation plus NSGA-II bookkeeping.
///
/// Only the allocation itself is serialized (for checkpoints): fitness,
/// rank, and crowding distance are all recomputed by the engine on resume,
/// and crowding distance is infinite for boundary individuals, which JSON
/// cannot round-trip as a number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    pub allocation: AllocationTensor,
    #[serde(skip)]
    pub fitness: Option<Fitness>,
    #[serde(skip)]
    pub rank: usize,
    #[serde(skip)]
    pub crowding_distance: f64,
}

impl Individual {
    pub fn new(allocation: AllocationTensor) -> Self {
        Self {
            allocation,
            fitness: None,
            rank: 0,
            crowding_distance: 0.0,
        }
    }

    pub fn objectives(&self) -> Option<Objectives> {
        self.fitness.map(|f| f.objectives)
    }
}
