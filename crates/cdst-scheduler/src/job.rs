//! A scenario submission and its terminal record: "what to run" and "what
//! happened", kept as separate types so a record can outlive the job that
//! produced it.

use cdst_core::ids::{OwnerId, ScenarioId};
use cdst_solver::{ExtractedResult, Parameters, Problem};
use serde::{Deserialize, Serialize};

/// One scenario submitted to the scheduler: a built problem plus the
/// parameters to evolve it under.
pub struct ScenarioJob {
    pub scenario_id: ScenarioId,
    pub owner: OwnerId,
    pub problem: Problem,
    pub parameters: Parameters,
}

/// Terminal record of a scenario run, suitable for persisting or handing
/// back over the `ScenarioRpc` surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub scenario_id: String,
    pub owner: String,
    pub status: String,
    pub error: Option<String>,
    pub generations_run: usize,
    pub result: Option<ExtractedResult>,
}
