//! # cdst-scheduler: Scenario Scheduler
//!
//! Admits, runs, and tracks scenario submissions against the synchronous
//! [`cdst_solver::EvolutionEngine`], enforcing per-user and global
//! concurrency caps, cooperative cancellation, a coalescing progress
//! channel, and periodic checkpointing.

pub mod checkpoint;
pub mod job;
pub mod rpc;
pub mod scheduler;
pub mod state;

pub use checkpoint::{CheckpointData, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore, MAGIC};
pub use job::{ScenarioJob, ScenarioRecord};
pub use rpc::ScenarioRpc;
pub use scheduler::{Scheduler, SchedulerConfig};
pub use state::ScenarioStatus;
