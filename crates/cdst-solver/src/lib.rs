//! # cdst-solver: Problem, Fitness Evaluator, NSGA-II, Result Extractor
//!
//! The optimization core. Takes a [`Problem`](problem::Problem) built by
//! `cdst-scenarios`, evolves a population of allocations under
//! [`Parameters`](parameters::Parameters), and hands the Pareto front to
//! [`result::extract`] for presentation.

pub mod allocation;
pub mod fitness;
pub mod nsga2;
pub mod parameters;
pub mod problem;
pub mod result;

pub use allocation::{AllocationTensor, Fitness, Individual, Objectives};
pub use fitness::FitnessEvaluator;
pub use nsga2::{EvolutionEngine, EvolutionOutcome, GenerationReport, Nsga2Engine, Stage};
pub use parameters::{AlgorithmParameters, ConstraintThresholds, ObjectiveWeights, Parameters};
pub use problem::{LabCapacity, Problem, ProblemBuilder, RoutingSource};
pub use result::{extract, AllocationRow, BaselineComparison, ExtractedResult, ResultCandidate};
