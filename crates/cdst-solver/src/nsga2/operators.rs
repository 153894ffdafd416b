//! Genetic operators: the three initialization strategies, tournament
//! selection, multi-point crossover, adaptive Gaussian mutation, and the
//! repair pass that restores feasibility after variation.

use crate::allocation::{AllocationTensor, Individual};
use crate::problem::Problem;
use cdst_core::ids::{AreaIndex, LabIndex, TestIndex};
use rand::seq::SliceRandom;
use rand::Rng;

/// Split `demand` across slots proportionally to `weights`, handing the
/// integer remainder to the largest fractional shares first. Falls back to
/// a uniform split when every weight is zero.
fn apportion(demand: u32, weights: &[f64]) -> Vec<u32> {
    if weights.is_empty() {
        return Vec::new();
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let n = weights.len() as u32;
        let base = demand / n;
        let extra = (demand % n) as usize;
        return (0..weights.len())
            .map(|k| base + u32::from(k < extra))
            .collect();
    }
    let mut shares = Vec::with_capacity(weights.len());
    let mut fractions: Vec<(usize, f64)> = Vec::with_capacity(weights.len());
    let mut assigned = 0u32;
    for (i, w) in weights.iter().enumerate() {
        let exact = demand as f64 * w / total;
        let base = exact.floor() as u32;
        shares.push(base);
        assigned += base;
        fractions.push((i, exact - base as f64));
    }
    fractions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let mut remainder = demand.saturating_sub(assigned);
    for (i, _) in fractions {
        if remainder == 0 {
            break;
        }
        shares[i] += 1;
        remainder -= 1;
    }
    shares
}

/// Every `(area, test)` pair with positive demand, in a shuffled order so
/// initialization strategies don't all consume lab capacity in the same
/// sequence.
fn shuffled_demand_pairs(problem: &Problem, rng: &mut impl Rng) -> Vec<(AreaIndex, TestIndex)> {
    let mut pairs: Vec<(AreaIndex, TestIndex)> = Vec::new();
    for a in problem.area_indices() {
        for t in problem.test_indices() {
            if problem.demand(a, t) > 0 {
                pairs.push((a, t));
            }
        }
    }
    pairs.shuffle(rng);
    pairs
}

/// Greedy seed: fill each area's nearest capable lab until its capacity is
/// exhausted, then spill to the next-nearest. A feasible starting point
/// instead of random noise the repair pass would spend generations fixing.
pub fn greedy_allocation(problem: &Problem, rng: &mut impl Rng) -> AllocationTensor {
    let mut allocation = AllocationTensor::zeros(problem.n_areas, problem.n_labs, problem.n_tests);
    for (a, t) in shuffled_demand_pairs(problem, rng) {
        let mut remaining = problem.demand(a, t);
        for j in problem.capable_labs_by_distance(a, t) {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(slack_for_test(problem, &allocation, j, t));
            if take > 0 {
                let current = allocation.get(a, j, t);
                allocation.set(a, j, t, current + take);
                remaining -= take;
            }
        }
        if remaining > 0 {
            // Out of nearest-first slack; leave the tail for repair to place.
            if let Some(&nearest) = problem.capable_labs_by_distance(a, t).first() {
                let current = allocation.get(a, nearest, t);
                allocation.set(a, nearest, t, current + remaining);
            }
        }
    }
    repair(problem, &mut allocation);
    allocation
}

/// Random seed: each `(area, test)` demand is split across capable labs in
/// random proportions.
pub fn random_allocation(problem: &Problem, rng: &mut impl Rng) -> AllocationTensor {
    let mut allocation = AllocationTensor::zeros(problem.n_areas, problem.n_labs, problem.n_tests);
    for (a, t) in shuffled_demand_pairs(problem, rng) {
        let labs = problem.capable_labs_by_distance(a, t);
        if labs.is_empty() {
            continue;
        }
        let weights: Vec<f64> = labs.iter().map(|_| rng.gen::<f64>() + 1e-6).collect();
        let shares = apportion(problem.demand(a, t), &weights);
        for (&j, share) in labs.iter().zip(shares) {
            allocation.set(a, j, t, share);
        }
    }
    repair(problem, &mut allocation);
    allocation
}

/// Capacity-balanced seed: each `(area, test)` demand is split across
/// capable labs in proportion to how much slack each still has, so heavily
/// loaded labs receive less of every subsequent pair.
pub fn capacity_balanced_allocation(problem: &Problem, rng: &mut impl Rng) -> AllocationTensor {
    let mut allocation = AllocationTensor::zeros(problem.n_areas, problem.n_labs, problem.n_tests);
    for (a, t) in shuffled_demand_pairs(problem, rng) {
        let labs = problem.capable_labs_by_distance(a, t);
        if labs.is_empty() {
            continue;
        }
        let weights: Vec<f64> = labs
            .iter()
            .map(|&j| slack_for_test(problem, &allocation, j, t) as f64 + 1.0)
            .collect();
        let shares = apportion(problem.demand(a, t), &weights);
        for (&j, share) in labs.iter().zip(shares) {
            allocation.set(a, j, t, share);
        }
    }
    repair(problem, &mut allocation);
    allocation
}

/// Tournament selection: draw `tournament_size` candidates uniformly and
/// keep the crowded-comparison winner.
pub fn tournament_select(
    individuals: &[Individual],
    tournament_size: usize,
    rng: &mut impl Rng,
) -> usize {
    use super::sorting::crowded_compare;
    let mut best = rng.gen_range(0..individuals.len());
    for _ in 1..tournament_size {
        let challenger = rng.gen_range(0..individuals.len());
        if crowded_compare(individuals, challenger, best) == std::cmp::Ordering::Less {
            best = challenger;
        }
    }
    best
}

/// Multi-point crossover over the flat gene vector: 1–3 cut points, with
/// the segments between them swapped between the parents. Children
/// generally violate the demand invariant at the cut boundaries, which is
/// what the repair pass is for.
pub fn crossover(
    a: &AllocationTensor,
    b: &AllocationTensor,
    rng: &mut impl Rng,
) -> (AllocationTensor, AllocationTensor) {
    let mut child_a = a.clone();
    let mut child_b = b.clone();
    let len = a.cells().len();
    if len < 2 {
        return (child_a, child_b);
    }
    let max_cuts = 3.min(len - 1);
    let n_cuts = rng.gen_range(1..=max_cuts);
    let mut cuts: Vec<usize> = (0..n_cuts).map(|_| rng.gen_range(1..len)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut swapping = false;
    let mut next_cut = 0usize;
    for i in 0..len {
        if next_cut < cuts.len() && i == cuts[next_cut] {
            swapping = !swapping;
            next_cut += 1;
        }
        if swapping {
            child_a.cells_mut()[i] = b.cells()[i];
            child_b.cells_mut()[i] = a.cells()[i];
        }
    }
    (child_a, child_b)
}

/// Standard normal via Box–Muller; good enough for a mutation kernel.
fn gaussian(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Per-gene Gaussian mutation: each capable gene is perturbed with
/// probability `rate` by a rounded draw from `N(0, sigma)`, clamped to
/// `[0, demand]`. The engine decays both `rate` and `sigma` as the run
/// progresses, so early generations explore and late ones fine-tune.
pub fn mutate(
    problem: &Problem,
    allocation: &mut AllocationTensor,
    rate: f64,
    sigma: f64,
    rng: &mut impl Rng,
) {
    if rate <= 0.0 || sigma <= 0.0 {
        return;
    }
    let rate = rate.clamp(0.0, 1.0);
    for a in problem.area_indices() {
        for t in problem.test_indices() {
            let demand = problem.demand(a, t);
            if demand == 0 {
                continue;
            }
            for j in problem.lab_indices() {
                if !problem.capable(j, t) || !rng.gen_bool(rate) {
                    continue;
                }
                let delta = (gaussian(rng) * sigma).round() as i64;
                if delta == 0 {
                    continue;
                }
                let current = allocation.get(a, j, t) as i64;
                allocation.set(a, j, t, (current + delta).clamp(0, demand as i64) as u32);
            }
        }
    }
}

/// How many more tests of kind `t` lab `j` can still absorb without
/// breaching either the equipment-minutes or the staff-minutes cap, given
/// `allocation`'s current load.
fn slack_for_test(problem: &Problem, allocation: &AllocationTensor, j: LabIndex, t: TestIndex) -> u32 {
    let available = problem.available_minutes(j);
    let proc = problem.proc_time_min(j, t);
    let staff_per_test = proc * problem.staff_req(j, t);

    let equip_used = allocation.lab_minutes(j, |j, t| problem.proc_time_min(j, t));
    let equip_cap = if proc > 0.0 {
        ((available - equip_used).max(0.0) / proc).floor() as u32
    } else {
        u32::MAX
    };

    let staff_used = allocation.lab_minutes(j, |j, t| problem.proc_time_min(j, t) * problem.staff_req(j, t));
    let staff_cap = if staff_per_test > 0.0 {
        ((available - staff_used).max(0.0) / staff_per_test).floor() as u32
    } else {
        u32::MAX
    };

    equip_cap.min(staff_cap)
}

/// Redirect `amount` units of `(a, t)` removed from `from` to the
/// next-nearest capable labs with slack, nearest first. Whatever can't be
/// placed anywhere stays dropped — the penalty term accounts for any
/// resulting demand shortfall.
fn redistribute_shortfall(problem: &Problem, allocation: &mut AllocationTensor, a: AreaIndex, t: TestIndex, from: LabIndex, amount: u32) {
    let mut remaining = amount;
    for j in problem.capable_labs_by_distance(a, t) {
        if remaining == 0 {
            break;
        }
        if j.index() == from.index() {
            continue;
        }
        let slack = slack_for_test(problem, allocation, j, t);
        let take = remaining.min(slack);
        if take > 0 {
            let current = allocation.get(a, j, t);
            allocation.set(a, j, t, current + take);
            remaining -= take;
        }
    }
}

/// Scale every lab whose `weight`-measured load exceeds `available_minutes`
/// back down to capacity, redistributing whatever each scale-down removes
/// to other capable labs with slack rather than dropping it outright.
fn scale_down_over_capacity(problem: &Problem, allocation: &mut AllocationTensor, weight: impl Fn(LabIndex, TestIndex) -> f64 + Copy) {
    for j in problem.lab_indices() {
        let available = problem.available_minutes(j);
        let used = allocation.lab_minutes(j, weight);
        if used <= available || used <= 0.0 {
            continue;
        }
        let scale = available / used;
        let mut shortfalls = Vec::new();
        for a in problem.area_indices() {
            for t in problem.test_indices() {
                let current = allocation.get(a, j, t);
                if current > 0 {
                    let scaled = ((current as f64) * scale).floor() as u32;
                    if scaled < current {
                        shortfalls.push((a, t, current - scaled));
                    }
                    allocation.set(a, j, t, scaled);
                }
            }
        }
        for (a, t, shortfall) in shortfalls {
            redistribute_shortfall(problem, allocation, a, t, j, shortfall);
        }
    }
}

/// Rescale one `(area, test)` row so its lab assignments sum to exactly
/// `demand`, preserving each lab's current proportion. The integer
/// remainder goes to the nearest labs first.
fn rescale_area_test(
    allocation: &mut AllocationTensor,
    a: AreaIndex,
    t: TestIndex,
    labs: &[LabIndex],
    demand: u32,
    total: u32,
) {
    let mut assigned = 0u32;
    for &j in labs {
        let current = allocation.get(a, j, t) as u64;
        let share = (current * demand as u64 / total as u64) as u32;
        allocation.set(a, j, t, share);
        assigned += share;
    }
    let mut remainder = demand - assigned;
    for &j in labs {
        if remainder == 0 {
            break;
        }
        allocation.set(a, j, t, allocation.get(a, j, t) + 1);
        remainder -= 1;
    }
}

/// Restore the demand invariant `Σ_j x[a,j,t] = demand[a,t]` for every
/// `(area, test)` pair: a row summing high or low is rescaled
/// proportionally to its current spread; a row summing to zero is split
/// uniformly across capable labs. Deterministic, so repair stays
/// idempotent.
fn normalize_demand(problem: &Problem, allocation: &mut AllocationTensor) {
    for a in problem.area_indices() {
        for t in problem.test_indices() {
            let demand = problem.demand(a, t);
            let labs = problem.capable_labs_by_distance(a, t);
            if labs.is_empty() {
                // Positive demand with no capable lab is rejected at
                // Problem build time; nothing to normalize here.
                continue;
            }
            let total: u32 = labs.iter().map(|&j| allocation.get(a, j, t)).sum();
            if total == demand {
                continue;
            }
            if total == 0 {
                let n = labs.len() as u32;
                let base = demand / n;
                let extra = (demand % n) as usize;
                for (k, &j) in labs.iter().enumerate() {
                    allocation.set(a, j, t, base + u32::from(k < extra));
                }
            } else {
                rescale_area_test(allocation, a, t, &labs, demand, total);
            }
        }
    }
}

/// Restore feasibility after crossover/mutation:
/// 1. zero out any allocation to a lab incapable of that test,
/// 2. rescale every `(area, test)` row so it sums to exactly its demand,
/// 3. scale down any lab whose equipment- or staff-minutes exceed
///    `available_minutes`, redirecting the removed tests to the
///    next-nearest capable lab with slack instead of simply discarding
///    them.
///
/// On a network whose capacity covers its demand (checked at Problem
/// build), the output satisfies demand conservation, capability respect,
/// and capacity respect simultaneously, and a second repair pass is a
/// no-op.
pub fn repair(problem: &Problem, allocation: &mut AllocationTensor) {
    for j in problem.lab_indices() {
        for t in problem.test_indices() {
            if !problem.capable(j, t) {
                for a in problem.area_indices() {
                    allocation.set(a, j, t, 0);
                }
            }
        }
    }

    normalize_demand(problem, allocation);

    scale_down_over_capacity(problem, allocation, |j, t| problem.proc_time_min(j, t));

    // Staff-minutes cycle constraint: proc time weighted by how many staff
    // a test ties up can't exceed total labor-minutes, independent of the
    // equipment-minutes cap above (a test can be equipment-light but
    // staff-heavy, or vice versa).
    scale_down_over_capacity(problem, allocation, |j, t| {
        problem.proc_time_min(j, t) * problem.staff_req(j, t)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{LabCapacity, ProblemBuilder};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_lab_problem() -> Problem {
        ProblemBuilder::new(1, 2, 1)
            .demand(AreaIndex::new(0), TestIndex::new(0), 20)
            .distance(AreaIndex::new(0), LabIndex::new(0), 2.0, 5.0)
            .distance(AreaIndex::new(0), LabIndex::new(1), 10.0, 20.0)
            .capacity(
                LabIndex::new(0),
                LabCapacity {
                    max_per_day: 100,
                    max_per_month: 2000,
                    staff_count: 1,
                    util_factor: 1.0,
                },
            )
            .capacity(
                LabIndex::new(1),
                LabCapacity {
                    max_per_day: 100,
                    max_per_month: 2000,
                    staff_count: 1,
                    util_factor: 1.0,
                },
            )
            .hours(LabIndex::new(0), [60.0; 7])
            .hours(LabIndex::new(1), [480.0; 7])
            .capability(LabIndex::new(0), TestIndex::new(0), 10.0, 1.0, 0.5, 3.0, 0.9)
            .capability(LabIndex::new(1), TestIndex::new(0), 10.0, 1.0, 0.5, 3.0, 0.9)
            .build()
    }

    fn demand_is_conserved(problem: &Problem, allocation: &AllocationTensor) -> bool {
        problem.area_indices().all(|a| {
            problem
                .test_indices()
                .all(|t| allocation.area_test_total(a, t) == problem.demand(a, t))
        })
    }

    #[test]
    fn greedy_allocation_prefers_nearest_lab() {
        let problem = two_lab_problem();
        let mut rng = StdRng::seed_from_u64(5);
        let allocation = greedy_allocation(&problem, &mut rng);
        assert!(allocation.get(AreaIndex::new(0), LabIndex::new(0), TestIndex::new(0)) > 0);
        assert!(demand_is_conserved(&problem, &allocation));
    }

    #[test]
    fn random_allocation_covers_demand_exactly() {
        let problem = two_lab_problem();
        let mut rng = StdRng::seed_from_u64(3);
        let allocation = random_allocation(&problem, &mut rng);
        assert!(demand_is_conserved(&problem, &allocation));
    }

    #[test]
    fn capacity_balanced_allocation_spreads_load_and_covers_demand() {
        let problem = two_lab_problem();
        let mut rng = StdRng::seed_from_u64(9);
        let allocation = capacity_balanced_allocation(&problem, &mut rng);
        assert!(demand_is_conserved(&problem, &allocation));
        // The larger lab has roughly 8x the slack, so it must get a share.
        assert!(allocation.get(AreaIndex::new(0), LabIndex::new(1), TestIndex::new(0)) > 0);
    }

    #[test]
    fn repair_zeros_out_incapable_cells() {
        let problem = ProblemBuilder::new(1, 1, 2)
            .capability(LabIndex::new(0), TestIndex::new(0), 10.0, 1.0, 0.1, 2.0, 1.0)
            .build();
        let mut allocation = AllocationTensor::zeros(1, 1, 2);
        allocation.set(AreaIndex::new(0), LabIndex::new(0), TestIndex::new(1), 5);
        repair(&problem, &mut allocation);
        assert_eq!(allocation.get(AreaIndex::new(0), LabIndex::new(0), TestIndex::new(1)), 0);
    }

    #[test]
    fn repair_restores_the_demand_invariant_from_an_empty_tensor() {
        let problem = two_lab_problem();
        let mut allocation = AllocationTensor::zeros(1, 2, 1);
        repair(&problem, &mut allocation);
        assert!(demand_is_conserved(&problem, &allocation));
    }

    #[test]
    fn repair_rescales_an_overshooting_row_back_to_demand() {
        let problem = two_lab_problem();
        let mut allocation = AllocationTensor::zeros(1, 2, 1);
        allocation.set(AreaIndex::new(0), LabIndex::new(0), TestIndex::new(0), 30);
        allocation.set(AreaIndex::new(0), LabIndex::new(1), TestIndex::new(0), 50);
        repair(&problem, &mut allocation);
        assert!(demand_is_conserved(&problem, &allocation));
    }

    #[test]
    fn repair_is_idempotent() {
        let problem = two_lab_problem();
        let mut allocation = AllocationTensor::zeros(1, 2, 1);
        allocation.set(AreaIndex::new(0), LabIndex::new(0), TestIndex::new(0), 1000);
        repair(&problem, &mut allocation);
        let once = allocation.clone();
        repair(&problem, &mut allocation);
        assert_eq!(once, allocation);
    }

    #[test]
    fn repair_scales_down_overloaded_lab() {
        let problem = two_lab_problem();
        let mut allocation = AllocationTensor::zeros(1, 2, 1);
        // lab 0 has 420 minutes/week available at 10 min/test => cap ~42.
        allocation.set(AreaIndex::new(0), LabIndex::new(0), TestIndex::new(0), 1000);
        repair(&problem, &mut allocation);
        let used = allocation.lab_minutes(LabIndex::new(0), |j, t| problem.proc_time_min(j, t));
        assert!(used <= problem.available_minutes(LabIndex::new(0)) + 1e-6);
    }

    #[test]
    fn repair_scales_down_a_lab_that_is_staff_constrained_but_not_equipment_constrained() {
        // proc_time_min alone fits comfortably (1 min/test against 420
        // available), but staff_req=5 means each test ties up five staff
        // for that minute, so the staff-minutes cap binds instead.
        let problem = ProblemBuilder::new(1, 1, 1)
            .distance(AreaIndex::new(0), LabIndex::new(0), 2.0, 5.0)
            .capacity(
                LabIndex::new(0),
                LabCapacity {
                    max_per_day: 1000,
                    max_per_month: 20000,
                    staff_count: 1,
                    util_factor: 1.0,
                },
            )
            .hours(LabIndex::new(0), [60.0; 7])
            .capability(LabIndex::new(0), TestIndex::new(0), 1.0, 5.0, 0.5, 2.0, 0.9)
            .build();
        let mut allocation = AllocationTensor::zeros(1, 1, 1);
        allocation.set(AreaIndex::new(0), LabIndex::new(0), TestIndex::new(0), 1000);
        repair(&problem, &mut allocation);
        let staff_minutes_used = allocation.lab_minutes(LabIndex::new(0), |j, t| {
            problem.proc_time_min(j, t) * problem.staff_req(j, t)
        });
        assert!(staff_minutes_used <= problem.available_minutes(LabIndex::new(0)) + 1e-6);
    }

    #[test]
    fn crossover_then_repair_preserves_demand() {
        let problem = two_lab_problem();
        let mut rng = StdRng::seed_from_u64(7);
        let a = greedy_allocation(&problem, &mut rng);
        let b = random_allocation(&problem, &mut rng);
        let (mut child_a, mut child_b) = crossover(&a, &b, &mut rng);
        repair(&problem, &mut child_a);
        repair(&problem, &mut child_b);
        assert!(demand_is_conserved(&problem, &child_a));
        assert!(demand_is_conserved(&problem, &child_b));
    }

    #[test]
    fn mutation_is_a_no_op_at_zero_rate() {
        let problem = two_lab_problem();
        let mut rng = StdRng::seed_from_u64(1);
        let original = greedy_allocation(&problem, &mut rng);
        let mut mutated = original.clone();
        mutate(&problem, &mut mutated, 0.0, 2.0, &mut rng);
        assert_eq!(original, mutated);
    }

    #[test]
    fn mutation_keeps_every_gene_within_its_demand_bound() {
        let problem = two_lab_problem();
        let mut rng = StdRng::seed_from_u64(2);
        let mut allocation = greedy_allocation(&problem, &mut rng);
        mutate(&problem, &mut allocation, 1.0, 50.0, &mut rng);
        for a in problem.area_indices() {
            for j in problem.lab_indices() {
                for t in problem.test_indices() {
                    assert!(allocation.get(a, j, t) <= problem.demand(a, t));
                }
            }
        }
    }

    #[test]
    fn apportion_splits_exactly_to_the_total() {
        let shares = apportion(10, &[1.0, 1.0, 1.0]);
        assert_eq!(shares.iter().sum::<u32>(), 10);
        let weighted = apportion(100, &[3.0, 1.0]);
        assert_eq!(weighted.iter().sum::<u32>(), 100);
        assert!(weighted[0] > weighted[1]);
    }
}
