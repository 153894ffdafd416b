//! Run parameters: objective weights, algorithm knobs, and the
//! hard/soft constraint thresholds the repair step enforces.

use cdst_core::{CdstError, CdstResult};
use serde::{Deserialize, Serialize};

/// Relative weights for the five objectives in the composite fitness `F`.
/// Must sum to 1.0 within floating-point tolerance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub distance: f64,
    pub time: f64,
    pub cost: f64,
    pub utilization: f64,
    pub accessibility: f64,
}

impl ObjectiveWeights {
    pub fn sum(&self) -> f64 {
        self.distance + self.time + self.cost + self.utilization + self.accessibility
    }

    pub fn validate(&self) -> CdstResult<()> {
        if (self.sum() - 1.0).abs() > 1e-6 {
            return Err(CdstError::Validation(format!(
                "objective weights must sum to 1.0, got {}",
                self.sum()
            )));
        }
        if self.as_array().iter().any(|w| *w < 0.0) {
            return Err(CdstError::Validation("objective weights must be non-negative".into()));
        }
        Ok(())
    }

    pub fn as_array(&self) -> [f64; 5] {
        [self.distance, self.time, self.cost, self.utilization, self.accessibility]
    }
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            distance: 0.2,
            time: 0.2,
            cost: 0.2,
            utilization: 0.2,
            accessibility: 0.2,
        }
    }
}

/// NSGA-II and GA operator knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlgorithmParameters {
    pub population_size: usize,
    pub max_generations: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub tournament_size: usize,
    /// Number of best-composite individuals carried into the next
    /// generation unconditionally, ahead of the rank/crowding survivor
    /// selection — insurance against a strong solution getting crowded out
    /// by a more diverse but weaker front.
    pub elite_size: usize,
    /// Width, in generations, of the rolling window the convergence check
    /// computes hypervolume-proxy variance over.
    pub convergence_window: usize,
    /// The run is considered converged once that rolling variance drops
    /// below this threshold.
    pub convergence_threshold: f64,
    /// Mean pairwise objective-space distance between population members
    /// below which the population is considered to have lost diversity —
    /// an independent, earlier stop signal than convergence.
    pub diversity_threshold: f64,
    /// Wall-clock budget for the whole run, in seconds. `None` means no
    /// time-based cutoff.
    pub time_budget_seconds: Option<f64>,
    /// Fixed RNG seed for reproducible runs; `None` seeds from OS entropy.
    pub random_seed: Option<u64>,
}

impl Default for AlgorithmParameters {
    fn default() -> Self {
        Self {
            population_size: 200,
            max_generations: 500,
            crossover_rate: 0.9,
            mutation_rate: 0.1,
            tournament_size: 3,
            elite_size: 20,
            convergence_window: 50,
            convergence_threshold: 1e-3,
            diversity_threshold: 1e-3,
            time_budget_seconds: Some(900.0),
            random_seed: None,
        }
    }
}

impl AlgorithmParameters {
    pub fn validate(&self) -> CdstResult<()> {
        if self.population_size < 4 {
            return Err(CdstError::Validation("population_size must be at least 4".into()));
        }
        if self.population_size % 2 != 0 {
            return Err(CdstError::Validation("population_size must be even for pairwise crossover".into()));
        }
        if self.max_generations == 0 {
            return Err(CdstError::Validation("max_generations must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(CdstError::Validation("crossover_rate must be in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(CdstError::Validation("mutation_rate must be in [0, 1]".into()));
        }
        if self.tournament_size < 2 {
            return Err(CdstError::Validation("tournament_size must be at least 2".into()));
        }
        if self.elite_size >= self.population_size {
            return Err(CdstError::Validation("elite_size must be smaller than population_size".into()));
        }
        if self.convergence_window == 0 {
            return Err(CdstError::Validation("convergence_window must be positive".into()));
        }
        if let Some(budget) = self.time_budget_seconds {
            if budget <= 0.0 {
                return Err(CdstError::Validation("time_budget_seconds must be positive when set".into()));
            }
        }
        Ok(())
    }
}

/// Hard and soft constraint thresholds the fitness penalty enforces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConstraintThresholds {
    /// Soft cap on distance traveled: exceeding this contributes a
    /// quadratic, threshold-normalized term to the penalty.
    pub max_travel_distance_km: f64,
    /// Soft cap on travel time: same quadratic treatment as distance.
    pub max_travel_time_minutes: f64,
    /// Minimum fraction of demand that must be satisfied for a candidate
    /// to be considered feasible at all.
    pub min_coverage_fraction: f64,
    /// Capability quality below this floor is penalized linearly by the
    /// shortfall.
    pub min_quality: f64,
    /// Lower bound of a lab's target utilization band.
    pub min_util: f64,
    /// Upper bound of a lab's target utilization band; utilization outside
    /// `[min_util, max_util]` is penalized quadratically by the violation.
    pub max_util: f64,
}

impl Default for ConstraintThresholds {
    fn default() -> Self {
        Self {
            max_travel_distance_km: 100.0,
            max_travel_time_minutes: 180.0,
            min_coverage_fraction: 0.95,
            min_quality: 0.0,
            min_util: 0.0,
            max_util: 1.0,
        }
    }
}

impl ConstraintThresholds {
    pub fn validate(&self) -> CdstResult<()> {
        if self.min_util > self.max_util {
            return Err(CdstError::Validation("min_util must not exceed max_util".into()));
        }
        if !(0.0..=1.0).contains(&self.min_coverage_fraction) {
            return Err(CdstError::Validation("min_coverage_fraction must be in [0, 1]".into()));
        }
        Ok(())
    }
}

/// Full parameter set for one solver run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Parameters {
    pub weights: ObjectiveWeights,
    pub algorithm: AlgorithmParameters,
    pub constraints: ConstraintThresholds,
    /// Weight applied to the soft-constraint penalty inside the composite
    /// fitness scalar used for tournament tie-breaking.
    pub penalty_weight: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            weights: ObjectiveWeights::default(),
            algorithm: AlgorithmParameters::default(),
            constraints: ConstraintThresholds::default(),
            penalty_weight: 1.0,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> CdstResult<()> {
        self.weights.validate()?;
        self.algorithm.validate()?;
        self.constraints.validate()?;
        if self.penalty_weight < 0.0 {
            return Err(CdstError::Validation("penalty_weight must be non-negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        assert!((ObjectiveWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn weights_not_summing_to_one_are_rejected() {
        let weights = ObjectiveWeights {
            distance: 0.5,
            time: 0.5,
            cost: 0.5,
            utilization: 0.0,
            accessibility: 0.0,
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn negative_weight_is_rejected() {
        let weights = ObjectiveWeights {
            distance: -0.1,
            time: 0.3,
            cost: 0.3,
            utilization: 0.3,
            accessibility: 0.2,
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn odd_population_size_is_rejected() {
        let mut algorithm = AlgorithmParameters::default();
        algorithm.population_size = 11;
        assert!(algorithm.validate().is_err());
    }

    #[test]
    fn default_parameters_validate() {
        assert!(Parameters::default().validate().is_ok());
    }
}
