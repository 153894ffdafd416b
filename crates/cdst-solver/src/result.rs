//! Result Extractor: turns the raw Pareto front into the decorated,
//! externally-facing rows a caller actually wants — one row per nonzero
//! `(area, lab, test)` cell, per-lab utilization, per-area accessibility,
//! and a baseline-comparison summary against a naive nearest-lab policy.

use crate::allocation::{AllocationTensor, Individual, Objectives};
use crate::fitness::FitnessEvaluator;
use crate::nsga2::EvolutionOutcome;
use crate::parameters::Parameters;
use crate::problem::Problem;
use serde::{Deserialize, Serialize};

/// One nonzero allocation cell, decorated with external IDs and the
/// per-cell distance/time/cost it represents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRow {
    pub area_id: String,
    pub lab_id: String,
    pub test_id: String,
    pub count: u32,
    pub distance_km: f64,
    pub time_minutes: f64,
    pub transport_cost: f64,
    pub processing_cost: f64,
    pub total_cost: f64,
}

/// How well one lab's load sits in the target band under a candidate
/// allocation, the same piecewise score `f4` averages across labs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabUtilization {
    pub lab_id: String,
    pub utilization_score: f64,
}

/// How well one area is served under a candidate allocation — the same
/// proximity/population/coverage blend `f5` averages across areas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaAccessibility {
    pub area_id: String,
    pub accessibility_score: f64,
}

/// One Pareto-optimal solution, ready to hand back to a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCandidate {
    pub objectives: Objectives,
    pub penalty: f64,
    pub composite: f64,
    pub rows: Vec<AllocationRow>,
    pub lab_utilization: Vec<LabUtilization>,
    pub area_accessibility: Vec<AreaAccessibility>,
}

/// Per-objective improvement of a candidate over the baseline, positive
/// meaning the candidate is better. All five objectives are stored in
/// minimizing orientation, so each improvement is `baseline - candidate`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObjectiveImprovement {
    pub distance: f64,
    pub time: f64,
    pub cost: f64,
    pub utilization: f64,
    pub accessibility: f64,
}

/// Summary comparing the chosen candidate against a naive nearest-capable-
/// lab baseline (every unit of demand sent to the single closest capable
/// lab, with no regard for its capacity), so a caller can see how much the
/// optimization actually bought over the obvious policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub baseline_uncovered_demand: u64,
    pub candidate_uncovered_demand: u64,
    pub demand_covered_delta: i64,
    pub candidate_total_cost: f64,
    pub baseline_objectives: Objectives,
    pub candidate_objectives: Objectives,
    pub improvement: ObjectiveImprovement,
}

/// Full extracted result: every Pareto-front member, decorated, plus a
/// comparison for the single best-composite candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedResult {
    pub candidates: Vec<ResultCandidate>,
    pub baseline_comparison: BaselineComparison,
    pub generations_run: usize,
    pub converged_early: bool,
}

fn lab_utilization(problem: &Problem, allocation: &AllocationTensor) -> Vec<LabUtilization> {
    problem
        .lab_indices()
        .map(|j| LabUtilization {
            lab_id: problem.lab_ids[j.index()].to_string(),
            utilization_score: crate::fitness::utilization_score(crate::fitness::lab_utilization_ratio(
                problem, allocation, j,
            )),
        })
        .collect()
}

fn area_accessibility(problem: &Problem, allocation: &AllocationTensor) -> Vec<AreaAccessibility> {
    problem
        .area_indices()
        .map(|a| AreaAccessibility {
            area_id: problem.area_ids[a.index()].to_string(),
            accessibility_score: crate::fitness::area_accessibility(problem, allocation, a),
        })
        .collect()
}

fn decorate(problem: &Problem, individual: &Individual) -> ResultCandidate {
    let fitness = individual.fitness.expect("individual not yet evaluated");
    let mut rows = Vec::new();
    for (a, j, t, count) in individual.allocation.iter_nonzero() {
        let transport_cost = count as f64 * problem.dist_km(a, j) * problem.cost_per_km;
        let processing_cost = count as f64 * problem.cost_per_test(j, t);
        rows.push(AllocationRow {
            area_id: problem.area_ids[a.index()].to_string(),
            lab_id: problem.lab_ids[j.index()].to_string(),
            test_id: problem.test_ids[t.index()].to_string(),
            count,
            distance_km: problem.dist_km(a, j),
            time_minutes: problem.time_min(a, j),
            transport_cost,
            processing_cost,
            total_cost: transport_cost + processing_cost,
        });
    }
    ResultCandidate {
        objectives: fitness.objectives,
        penalty: fitness.penalty,
        composite: fitness.composite,
        lab_utilization: lab_utilization(problem, &individual.allocation),
        area_accessibility: area_accessibility(problem, &individual.allocation),
        rows,
    }
}

fn total_demand(problem: &Problem) -> u64 {
    let mut total = 0u64;
    for a in problem.area_indices() {
        for t in problem.test_indices() {
            total += problem.demand(a, t) as u64;
        }
    }
    total
}

fn covered_demand(problem: &Problem, allocation: &AllocationTensor) -> u64 {
    let mut total = 0u64;
    for a in problem.area_indices() {
        for t in problem.test_indices() {
            let demand = problem.demand(a, t) as u64;
            let covered = allocation.area_test_total(a, t) as u64;
            total += covered.min(demand);
        }
    }
    total
}

/// Every unit of demand routed to the single nearest capable lab, with no
/// regard for that lab's capacity — the naive policy an optimizer should
/// beat, not a feasible candidate in its own right.
fn nearest_lab_baseline(problem: &Problem) -> AllocationTensor {
    let mut allocation = AllocationTensor::zeros(problem.n_areas, problem.n_labs, problem.n_tests);
    for a in problem.area_indices() {
        for t in problem.test_indices() {
            let demand = problem.demand(a, t);
            if demand == 0 {
                continue;
            }
            if let Some(&nearest) = problem.capable_labs_by_distance(a, t).first() {
                allocation.set(a, nearest, t, demand);
            }
        }
    }
    allocation
}

/// Extract every Pareto-front individual into externally-facing rows, and
/// compute a baseline comparison against the front's best-composite member.
pub fn extract(problem: &Problem, parameters: &Parameters, outcome: &EvolutionOutcome) -> ExtractedResult {
    let candidates: Vec<ResultCandidate> = outcome
        .pareto_front
        .iter()
        .map(|&idx| decorate(problem, &outcome.population[idx]))
        .collect();

    let best_idx = outcome
        .pareto_front
        .iter()
        .copied()
        .min_by(|&a, &b| {
            outcome.population[a]
                .fitness
                .unwrap()
                .composite
                .partial_cmp(&outcome.population[b].fitness.unwrap().composite)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(0);
    let best = &outcome.population[best_idx];

    let baseline_allocation = nearest_lab_baseline(problem);
    let evaluator = FitnessEvaluator::new(problem, *parameters);
    let baseline_objectives = evaluator.evaluate(&baseline_allocation).objectives;
    let candidate_objectives = best.fitness.expect("best candidate not yet evaluated").objectives;

    let total = total_demand(problem);
    let baseline_covered = covered_demand(problem, &baseline_allocation);
    let candidate_covered = covered_demand(problem, &best.allocation);

    let baseline_comparison = BaselineComparison {
        baseline_uncovered_demand: total.saturating_sub(baseline_covered),
        candidate_uncovered_demand: total.saturating_sub(candidate_covered),
        demand_covered_delta: candidate_covered as i64 - baseline_covered as i64,
        candidate_total_cost: best
            .allocation
            .iter_nonzero()
            .map(|(a, j, t, count)| {
                count as f64 * (problem.dist_km(a, j) * problem.cost_per_km + problem.cost_per_test(j, t))
            })
            .sum(),
        baseline_objectives,
        candidate_objectives,
        improvement: ObjectiveImprovement {
            distance: baseline_objectives.f1_distance - candidate_objectives.f1_distance,
            time: baseline_objectives.f2_time - candidate_objectives.f2_time,
            cost: baseline_objectives.f3_cost - candidate_objectives.f3_cost,
            utilization: baseline_objectives.f4_utilization - candidate_objectives.f4_utilization,
            accessibility: baseline_objectives.f5_accessibility - candidate_objectives.f5_accessibility,
        },
    };

    ExtractedResult {
        candidates,
        baseline_comparison,
        generations_run: outcome.generations_run,
        converged_early: outcome.converged_early,
    }
}
