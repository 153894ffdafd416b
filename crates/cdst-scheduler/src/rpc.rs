//! The external interface the scheduler presents to a caller.
//!
//! The actual RPC transport (HTTP/gRPC) is out of scope; this trait is the
//! in-process seam it would sit behind, the same way `SolverPlugin`
//! decouples a solver's logic from the IPC harness that calls it. `cdst-cli`
//! is the only caller in this repository, and calls [`Scheduler`] directly
//! through it rather than through a transport.

use crate::job::{ScenarioJob, ScenarioRecord};
use crate::scheduler::Scheduler;
use crate::state::ScenarioStatus;
use cdst_core::ids::ScenarioId;
use cdst_core::CdstResult;
use cdst_solver::GenerationReport;
use tokio::sync::watch;

pub trait ScenarioRpc {
    /// Submit a scenario for evolution, returning a progress receiver.
    fn run_scenario(&self, job: ScenarioJob) -> watch::Receiver<Option<GenerationReport>>;

    /// Cancel a scenario by id. A no-op if it's already terminal.
    fn cancel_scenario(&self, id: &ScenarioId) -> CdstResult<()>;

    /// Current lifecycle status, if the scenario id is known.
    fn scenario_status(&self, id: &ScenarioId) -> Option<ScenarioStatus>;

    /// The terminal record, once the scenario has finished.
    fn get_result(&self, id: &ScenarioId) -> Option<ScenarioRecord>;
}

impl ScenarioRpc for Scheduler {
    fn run_scenario(&self, job: ScenarioJob) -> watch::Receiver<Option<GenerationReport>> {
        self.submit(job)
    }

    fn cancel_scenario(&self, id: &ScenarioId) -> CdstResult<()> {
        self.cancel(id)
    }

    fn scenario_status(&self, id: &ScenarioId) -> Option<ScenarioStatus> {
        self.status(id)
    }

    fn get_result(&self, id: &ScenarioId) -> Option<ScenarioRecord> {
        self.record(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::InMemoryCheckpointStore;
    use crate::scheduler::SchedulerConfig;
    use cdst_core::ids::{AreaIndex, LabIndex, OwnerId, TestIndex};
    use cdst_solver::{LabCapacity, ObjectiveWeights, Parameters, ProblemBuilder};
    use std::sync::Arc;

    fn tiny_job(id: &str) -> ScenarioJob {
        let problem = ProblemBuilder::new(1, 1, 1)
            .demand(AreaIndex::new(0), TestIndex::new(0), 5)
            .distance(AreaIndex::new(0), LabIndex::new(0), 2.0, 5.0)
            .capacity(
                LabIndex::new(0),
                LabCapacity {
                    max_per_day: 50,
                    max_per_month: 1000,
                    staff_count: 1,
                    util_factor: 1.0,
                },
            )
            .hours(LabIndex::new(0), [480.0; 7])
            .capability(LabIndex::new(0), TestIndex::new(0), 10.0, 1.0, 0.5, 2.0, 0.9)
            .build();
        let mut parameters = Parameters::default();
        parameters.algorithm.population_size = 4;
        parameters.algorithm.max_generations = 2;
        parameters.algorithm.elite_size = 1;
        parameters.algorithm.random_seed = Some(3);
        parameters.weights = ObjectiveWeights::default();
        ScenarioJob {
            scenario_id: ScenarioId::new(id),
            owner: OwnerId::new("alice"),
            problem,
            parameters,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scheduler_satisfies_the_scenario_rpc_interface() {
        let scheduler: Arc<dyn ScenarioRpc + Send + Sync> = Arc::new(Scheduler::new(
            SchedulerConfig::default(),
            Arc::new(InMemoryCheckpointStore::default()),
        ));
        let id = ScenarioId::new("rpc-1");
        scheduler.run_scenario(tiny_job("rpc-1"));

        for _ in 0..200 {
            if scheduler
                .scenario_status(&id)
                .map(|s| s.is_terminal())
                .unwrap_or(false)
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(scheduler.get_result(&id).is_some());
    }
}
