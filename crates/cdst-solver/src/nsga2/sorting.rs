//! Fast non-dominated sort and crowding distance (Deb et al., NSGA-II).

use super::dominance::dominates;
use crate::allocation::Individual;

/// Partition `individuals` into Pareto fronts, front 0 being
/// non-dominated. Returns indices into `individuals`, grouped by front.
pub fn fast_non_dominated_sort(individuals: &[Individual]) -> Vec<Vec<usize>> {
    let n = individuals.len();
    let mut dominates_set: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];
    let mut fronts: Vec<Vec<usize>> = vec![Vec::new()];

    for p in 0..n {
        let obj_p = individuals[p].objectives().expect("individual not yet evaluated");
        for q in 0..n {
            if p == q {
                continue;
            }
            let obj_q = individuals[q].objectives().expect("individual not yet evaluated");
            if dominates(&obj_p, &obj_q) {
                dominates_set[p].push(q);
            } else if dominates(&obj_q, &obj_p) {
                domination_count[p] += 1;
            }
        }
        if domination_count[p] == 0 {
            fronts[0].push(p);
        }
    }

    let mut i = 0;
    while !fronts[i].is_empty() {
        let mut next_front = Vec::new();
        for &p in &fronts[i] {
            for &q in &dominates_set[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next_front.push(q);
                }
            }
        }
        i += 1;
        fronts.push(next_front);
    }
    fronts.pop();
    fronts
}

/// Assign crowding distance within a single front, writing back into
/// `individuals[idx].crowding_distance` for each `idx` in `front`.
pub fn assign_crowding_distance(individuals: &mut [Individual], front: &[usize]) {
    let n = front.len();
    if n == 0 {
        return;
    }
    for &idx in front {
        individuals[idx].crowding_distance = 0.0;
    }
    if n <= 2 {
        for &idx in front {
            individuals[idx].crowding_distance = f64::INFINITY;
        }
        return;
    }

    for m in 0..5 {
        let mut sorted: Vec<usize> = front.to_vec();
        sorted.sort_by(|&a, &b| {
            let va = individuals[a].objectives().unwrap().as_array()[m];
            let vb = individuals[b].objectives().unwrap().as_array()[m];
            va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
        });

        individuals[sorted[0]].crowding_distance = f64::INFINITY;
        individuals[sorted[n - 1]].crowding_distance = f64::INFINITY;

        let min = individuals[sorted[0]].objectives().unwrap().as_array()[m];
        let max = individuals[sorted[n - 1]].objectives().unwrap().as_array()[m];
        let range = max - min;
        if range <= 0.0 {
            continue;
        }

        for k in 1..n - 1 {
            if individuals[sorted[k]].crowding_distance.is_infinite() {
                continue;
            }
            let prev = individuals[sorted[k - 1]].objectives().unwrap().as_array()[m];
            let next = individuals[sorted[k + 1]].objectives().unwrap().as_array()[m];
            individuals[sorted[k]].crowding_distance += (next - prev) / range;
        }
    }
}

/// Crowded-comparison order: lower rank wins; ties broken by larger
/// crowding distance (more isolated individuals preferred).
pub fn crowded_compare(individuals: &[Individual], a: usize, b: usize) -> std::cmp::Ordering {
    individuals[a]
        .rank
        .cmp(&individuals[b].rank)
        .then_with(|| {
            individuals[b]
                .crowding_distance
                .partial_cmp(&individuals[a].crowding_distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::{AllocationTensor, Fitness, Objectives};

    fn individual_with(f1: f64, f2: f64) -> Individual {
        let mut ind = Individual::new(AllocationTensor::zeros(1, 1, 1));
        ind.fitness = Some(Fitness {
            objectives: Objectives {
                f1_distance: f1,
                f2_time: f2,
                f3_cost: 0.0,
                f4_utilization: 0.0,
                f5_accessibility: 0.0,
            },
            penalty: 0.0,
            composite: f1 + f2,
        });
        ind
    }

    #[test]
    fn sorts_a_simple_tradeoff_front_into_one_group() {
        let individuals = vec![
            individual_with(1.0, 5.0),
            individual_with(3.0, 3.0),
            individual_with(5.0, 1.0),
        ];
        let fronts = fast_non_dominated_sort(&individuals);
        assert_eq!(fronts.len(), 1);
        assert_eq!(fronts[0].len(), 3);
    }

    #[test]
    fn dominated_individual_lands_in_a_later_front() {
        let individuals = vec![
            individual_with(1.0, 1.0),
            individual_with(2.0, 2.0),
            individual_with(3.0, 3.0),
        ];
        let fronts = fast_non_dominated_sort(&individuals);
        assert_eq!(fronts.len(), 3);
        assert_eq!(fronts[0], vec![0]);
        assert_eq!(fronts[2], vec![2]);
    }

    #[test]
    fn boundary_points_get_infinite_crowding_distance() {
        let mut individuals = vec![
            individual_with(1.0, 5.0),
            individual_with(3.0, 3.0),
            individual_with(5.0, 1.0),
        ];
        let front = vec![0, 1, 2];
        assign_crowding_distance(&mut individuals, &front);
        assert!(individuals[0].crowding_distance.is_infinite());
        assert!(individuals[2].crowding_distance.is_infinite());
        assert!(individuals[1].crowding_distance.is_finite());
    }

    #[test]
    fn crowded_compare_prefers_lower_rank() {
        let mut individuals = vec![individual_with(1.0, 1.0), individual_with(2.0, 2.0)];
        individuals[0].rank = 0;
        individuals[1].rank = 1;
        assert_eq!(crowded_compare(&individuals, 0, 1), std::cmp::Ordering::Less);
    }
}
