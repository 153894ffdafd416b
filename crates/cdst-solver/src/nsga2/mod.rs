//! NSGA-II: dominance, fast non-dominated sort, crowding distance, genetic
//! operators, and the engine that drives them through generations.

pub mod dominance;
pub mod engine;
pub mod operators;
pub mod sorting;

pub use engine::{EvolutionEngine, EvolutionOutcome, GenerationReport, Nsga2Engine, Stage};
