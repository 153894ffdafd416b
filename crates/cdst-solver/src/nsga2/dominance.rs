//! Pareto dominance over the five objectives.
//!
//! Every objective is stored in minimizing orientation — the utilization
//! and accessibility scores are negated inside the evaluator — so
//! dominance is a plain coordinate-wise comparison with no per-objective
//! min/max flag threaded through.

use crate::allocation::Objectives;

/// `true` if `a` Pareto-dominates `b`: no worse in every objective, and
/// strictly better in at least one.
pub fn dominates(a: &Objectives, b: &Objectives) -> bool {
    let va = a.as_array();
    let vb = b.as_array();
    let mut strictly_better = false;
    for i in 0..5 {
        if va[i] > vb[i] {
            return false;
        }
        if va[i] < vb[i] {
            strictly_better = true;
        }
    }
    strictly_better
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(f1: f64, f2: f64, f3: f64, f4: f64, f5: f64) -> Objectives {
        Objectives {
            f1_distance: f1,
            f2_time: f2,
            f3_cost: f3,
            f4_utilization: f4,
            f5_accessibility: f5,
        }
    }

    #[test]
    fn strictly_better_in_all_dominates() {
        let a = obj(1.0, 1.0, 1.0, -0.8, -0.9);
        let b = obj(2.0, 2.0, 2.0, -0.5, -0.4);
        assert!(dominates(&a, &b));
        assert!(!dominates(&b, &a));
    }

    #[test]
    fn identical_objectives_do_not_dominate() {
        let a = obj(1.0, 1.0, 1.0, 1.0, 1.0);
        let b = a;
        assert!(!dominates(&a, &b));
    }

    #[test]
    fn mixed_tradeoff_is_non_dominated() {
        let a = obj(1.0, 5.0, 1.0, 1.0, 1.0);
        let b = obj(5.0, 1.0, 1.0, 1.0, 1.0);
        assert!(!dominates(&a, &b));
        assert!(!dominates(&b, &a));
    }

    #[test]
    fn better_accessibility_dominates_when_all_else_equal() {
        // Accessibility is stored negated, so the better candidate carries
        // the smaller (more negative) value.
        let a = obj(1.0, 1.0, 1.0, 1.0, -0.9);
        let b = obj(1.0, 1.0, 1.0, 1.0, -0.5);
        assert!(dominates(&a, &b));
    }
}
