//! The scheduler: admission control, cooperative cancellation, progress
//! broadcast, and periodic checkpointing around the synchronous
//! [`EvolutionEngine`].
//!
//! The optimization loop itself is CPU-bound and synchronous; this module
//! is the async shell around it, driving the blocking engine on a
//! `spawn_blocking` worker with a cancel flag checked at generation
//! boundaries.

use crate::checkpoint::{CheckpointData, CheckpointStore};
use crate::job::{ScenarioJob, ScenarioRecord};
use crate::state::ScenarioStatus;
use cdst_core::ids::{OwnerId, ScenarioId};
use cdst_core::{CdstError, CdstResult};
use cdst_solver::{extract, EvolutionEngine, EvolutionOutcome, GenerationReport, Individual, Nsga2Engine};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// How often the latest progress frame is re-sent to subscribers even when
/// no generation boundary has passed, so slow generations still produce a
/// live elapsed/ETA readout.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Admission limits: at most `max_per_user` scenarios running at once for
/// any one owner, at most `max_global` running across all owners, and a
/// wall-clock ceiling per run.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub max_per_user: usize,
    pub max_global: usize,
    pub checkpoint_every_generations: usize,
    /// Hard wall-clock cap per scenario. Reaching it cancels the run
    /// cooperatively and records it as `failed` with a timeout error; the
    /// best-so-far Pareto front is still extracted and stored.
    pub timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_per_user: 3,
            max_global: 4,
            checkpoint_every_generations: 50,
            timeout: Duration::from_secs(900),
        }
    }
}

struct Handle {
    status: ScenarioStatus,
    owner: OwnerId,
    cancel: Arc<AtomicBool>,
    progress_tx: Arc<watch::Sender<Option<GenerationReport>>>,
}

struct Inner {
    queues: HashMap<OwnerId, VecDeque<ScenarioJob>>,
    round_robin: VecDeque<OwnerId>,
    running_per_owner: HashMap<OwnerId, usize>,
    running_global: usize,
    handles: HashMap<ScenarioId, Handle>,
    records: HashMap<ScenarioId, ScenarioRecord>,
}

impl Inner {
    fn new() -> Self {
        Self {
            queues: HashMap::new(),
            round_robin: VecDeque::new(),
            running_per_owner: HashMap::new(),
            running_global: 0,
            handles: HashMap::new(),
            records: HashMap::new(),
        }
    }
}

/// The Scenario Scheduler. Cloning is cheap (it's a thin handle over
/// `Arc`s); every async consumer should hold a clone, not a reference.
#[derive(Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    checkpoint_store: Arc<dyn CheckpointStore>,
    engine: Arc<dyn EvolutionEngine + Send + Sync>,
    inner: Arc<Mutex<Inner>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, checkpoint_store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            config,
            checkpoint_store,
            engine: Arc::new(Nsga2Engine),
            inner: Arc::new(Mutex::new(Inner::new())),
        }
    }

    /// Use a non-default engine (kept for tests/future algorithms; the
    /// scheduler itself never constructs concrete engine types beyond
    /// the default).
    pub fn with_engine(mut self, engine: Arc<dyn EvolutionEngine + Send + Sync>) -> Self {
        self.engine = engine;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("scheduler mutex poisoned")
    }

    /// Enqueue a scenario and immediately attempt admission. Returns a
    /// [`watch::Receiver`] the caller can poll/await for progress frames:
    /// `watch` naturally drops intermediate frames a slow subscriber never
    /// gets around to reading, coalescing to the latest generation report.
    pub fn submit(&self, job: ScenarioJob) -> watch::Receiver<Option<GenerationReport>> {
        let (tx, rx) = watch::channel(None);
        let scenario_id = job.scenario_id.clone();
        let owner = job.owner.clone();

        {
            let mut inner = self.lock();
            inner.handles.insert(
                scenario_id.clone(),
                Handle {
                    status: ScenarioStatus::Pending,
                    owner: owner.clone(),
                    cancel: Arc::new(AtomicBool::new(false)),
                    progress_tx: Arc::new(tx),
                },
            );
            if !inner.queues.contains_key(&owner) {
                inner.round_robin.push_back(owner.clone());
            }
            inner.queues.entry(owner).or_default().push_back(job);
        }

        self.clone().try_admit();
        rx
    }

    pub fn status(&self, id: &ScenarioId) -> Option<ScenarioStatus> {
        self.lock().handles.get(id).map(|h| h.status)
    }

    pub fn record(&self, id: &ScenarioId) -> Option<ScenarioRecord> {
        self.lock().records.get(id).cloned()
    }

    /// Cooperative cancellation: a pending scenario is dequeued and marked
    /// cancelled immediately; a running one has its cancel flag set and is
    /// left to notice it at its next generation boundary. Idempotent —
    /// cancelling a terminal or already-cancelled scenario is a no-op.
    pub fn cancel(&self, id: &ScenarioId) -> CdstResult<()> {
        let mut inner = self.lock();
        let owner = {
            let handle = inner
                .handles
                .get(id)
                .ok_or_else(|| CdstError::Scheduler(format!("unknown scenario '{}'", id.as_str())))?;
            if handle.status.is_terminal() {
                return Ok(());
            }
            handle.owner.clone()
        };

        let was_pending = inner.handles.get(id).unwrap().status == ScenarioStatus::Pending;
        if was_pending {
            if let Some(queue) = inner.queues.get_mut(&owner) {
                queue.retain(|job| job.scenario_id != *id);
            }
        } else {
            inner.handles.get(id).unwrap().cancel.store(true, Ordering::SeqCst);
        }

        if was_pending {
            let handle = inner.handles.get_mut(id).unwrap();
            handle.status = ScenarioStatus::Cancelled;
            let _ = handle.progress_tx.send(None);
            inner.records.insert(
                id.clone(),
                ScenarioRecord {
                    scenario_id: id.as_str().to_string(),
                    owner: owner.as_str().to_string(),
                    status: "cancelled".into(),
                    error: None,
                    generations_run: 0,
                    result: None,
                },
            );
        }
        Ok(())
    }

    fn try_admit(self) {
        loop {
            let admitted = {
                let mut inner = self.lock();
                if inner.running_global >= self.config.max_global {
                    None
                } else {
                    // Among owners with queued work and headroom, prefer
                    // whoever has the fewest scenarios running; the
                    // round-robin order breaks ties.
                    let candidates: Vec<OwnerId> = inner.round_robin.iter().cloned().collect();
                    let mut chosen: Option<(OwnerId, usize)> = None;
                    for owner in candidates {
                        let has_job = inner.queues.get(&owner).map(|q| !q.is_empty()).unwrap_or(false);
                        if !has_job {
                            continue;
                        }
                        let running_for_owner = *inner.running_per_owner.get(&owner).unwrap_or(&0);
                        if running_for_owner >= self.config.max_per_user {
                            continue;
                        }
                        let replace = match &chosen {
                            Some((_, best)) => running_for_owner < *best,
                            None => true,
                        };
                        if replace {
                            chosen = Some((owner, running_for_owner));
                        }
                    }
                    match chosen {
                        Some((owner, _)) => {
                            let job = inner.queues.get_mut(&owner).unwrap().pop_front().unwrap();
                            *inner.running_per_owner.entry(owner.clone()).or_insert(0) += 1;
                            inner.running_global += 1;
                            if let Some(pos) = inner.round_robin.iter().position(|o| *o == owner) {
                                let owner_rotate = inner.round_robin.remove(pos).unwrap();
                                inner.round_robin.push_back(owner_rotate);
                            }
                            let handle = inner.handles.get_mut(&job.scenario_id).unwrap();
                            handle.status = ScenarioStatus::Running;
                            Some(job)
                        }
                        None => None,
                    }
                }
            };

            match admitted {
                Some(job) => {
                    let scheduler = self.clone();
                    tokio::spawn(async move { scheduler.run_job(job).await });
                }
                None => break,
            }
        }
    }

    async fn run_job(&self, job: ScenarioJob) {
        let scenario_id = job.scenario_id.clone();
        let owner = job.owner.clone();
        info!(scenario = %scenario_id, "starting scenario run");

        let (cancel, progress_tx) = {
            let inner = self.lock();
            let handle = inner.handles.get(&scenario_id).expect("handle exists for running job");
            (handle.cancel.clone(), handle.progress_tx.clone())
        };

        // Resume from a checkpoint left by a previous process if one exists
        // for this scenario. A checkpoint that can't be parsed back into a
        // population means resume is impossible, not that it's safe to
        // silently restart from generation zero — that scenario fails
        // outright instead.
        let seed_population = match self.checkpoint_store.load(&scenario_id) {
            Ok(Some(data)) => match serde_json::from_str::<Vec<Individual>>(&data.population_json) {
                Ok(population) => {
                    info!(scenario = %scenario_id, generation = data.generation, "resuming from checkpoint");
                    Some(population)
                }
                Err(err) => {
                    warn!(scenario = %scenario_id, error = %err, "checkpoint population unreadable, failing scenario");
                    let record = ScenarioRecord {
                        scenario_id: scenario_id.as_str().to_string(),
                        owner: owner.as_str().to_string(),
                        status: "failed".into(),
                        error: Some(format!("unreadable checkpoint: {err}")),
                        generations_run: data.generation,
                        result: None,
                    };
                    self.finish_job(&scenario_id, &owner, record).await;
                    return;
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(scenario = %scenario_id, error = %err, "checkpoint store read failed, starting fresh");
                None
            }
        };

        // Timeout is just a scheduler-set cancellation with a different
        // terminal disposition.
        let timed_out = Arc::new(AtomicBool::new(false));
        let watchdog = tokio::spawn({
            let cancel = cancel.clone();
            let timed_out = timed_out.clone();
            let timeout = self.config.timeout;
            let watchdog_scenario = scenario_id.clone();
            async move {
                tokio::time::sleep(timeout).await;
                warn!(scenario = %watchdog_scenario, "scenario exceeded its time budget, cancelling");
                timed_out.store(true, Ordering::SeqCst);
                cancel.store(true, Ordering::SeqCst);
            }
        });

        // Re-send the latest frame on a short interval so subscribers see a
        // fresh elapsed/ETA even mid-generation.
        let latest_frame: Arc<Mutex<Option<GenerationReport>>> = Arc::new(Mutex::new(None));
        let heartbeat = tokio::spawn({
            let latest_frame = latest_frame.clone();
            let progress_tx = progress_tx.clone();
            async move {
                let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
                loop {
                    ticker.tick().await;
                    let frame = latest_frame.lock().expect("heartbeat frame lock poisoned").clone();
                    if let Some(frame) = frame {
                        let _ = progress_tx.send(Some(frame));
                    }
                }
            }
        });

        let engine = self.engine.clone();
        let checkpoint_store = self.checkpoint_store.clone();
        let checkpoint_every = self.config.checkpoint_every_generations;
        let problem = job.problem;
        let problem_for_extract = problem.clone();
        let parameters = job.parameters;
        let parameters_for_extract = parameters;
        let checkpoint_scenario_id = scenario_id.clone();
        let worker_cancel = cancel.clone();
        let worker_frame = latest_frame.clone();
        let worker_tx = progress_tx.clone();

        let outcome_result = tokio::task::spawn_blocking(move || {
            engine.run(
                &problem,
                &parameters,
                seed_population,
                &mut |report: &GenerationReport, population: &[Individual]| {
                    *worker_frame.lock().expect("heartbeat frame lock poisoned") = Some(report.clone());
                    let _ = worker_tx.send(Some(report.clone()));
                    if checkpoint_every > 0 && report.generation > 0 && report.generation % checkpoint_every == 0 {
                        let population_json = match serde_json::to_string(population) {
                            Ok(json) => json,
                            Err(err) => {
                                warn!(scenario = %checkpoint_scenario_id, error = %err, "population serialization failed");
                                String::new()
                            }
                        };
                        let data = CheckpointData {
                            scenario_id: checkpoint_scenario_id.as_str().to_string(),
                            generation: report.generation,
                            best_composite: report.best_composite,
                            population_json,
                        };
                        if let Err(err) = checkpoint_store.save(&checkpoint_scenario_id, &data) {
                            warn!(scenario = %checkpoint_scenario_id, error = %err, "checkpoint write failed");
                        }
                    }
                    !worker_cancel.load(Ordering::SeqCst)
                },
            )
        })
        .await;
        heartbeat.abort();
        watchdog.abort();

        let was_cancelled = cancel.load(Ordering::SeqCst);
        let was_timed_out = timed_out.load(Ordering::SeqCst);

        let record = match outcome_result {
            Ok(outcome) => self.finish_record(
                &scenario_id,
                &owner,
                &problem_for_extract,
                &parameters_for_extract,
                outcome,
                was_cancelled,
                was_timed_out,
            ),
            Err(join_err) => ScenarioRecord {
                scenario_id: scenario_id.as_str().to_string(),
                owner: owner.as_str().to_string(),
                status: "failed".into(),
                error: Some(format!("worker task panicked: {join_err}")),
                generations_run: 0,
                result: None,
            },
        };

        self.finish_job(&scenario_id, &owner, record).await;
    }

    /// Shared tail bookkeeping once a job's outcome is known (normally or
    /// failed outright, e.g. from an unreadable checkpoint before the
    /// engine ever ran): record the result, release the admission slot,
    /// drop the checkpoint, and let the next queued job in.
    async fn finish_job(&self, scenario_id: &ScenarioId, owner: &OwnerId, record: ScenarioRecord) {
        let final_status = match record.status.as_str() {
            "completed" => ScenarioStatus::Completed,
            "cancelled" => ScenarioStatus::Cancelled,
            _ => ScenarioStatus::Failed,
        };

        {
            let mut inner = self.lock();
            if let Some(handle) = inner.handles.get_mut(scenario_id) {
                handle.status = final_status;
            }
            inner.records.insert(scenario_id.clone(), record);
            if let Some(count) = inner.running_per_owner.get_mut(owner) {
                *count = count.saturating_sub(1);
            }
            inner.running_global = inner.running_global.saturating_sub(1);
        }
        let _ = self.checkpoint_store.clear(scenario_id);

        info!(scenario = %scenario_id, status = ?final_status, "scenario run finished");
        self.clone().try_admit();
    }

    /// A cancelled or timed-out run still extracts its best-so-far Pareto
    /// front; whatever evolution bought before the stop is worth keeping.
    #[allow(clippy::too_many_arguments)]
    fn finish_record(
        &self,
        scenario_id: &ScenarioId,
        owner: &OwnerId,
        problem: &cdst_solver::Problem,
        parameters: &cdst_solver::Parameters,
        outcome: EvolutionOutcome,
        was_cancelled: bool,
        was_timed_out: bool,
    ) -> ScenarioRecord {
        let generations_run = outcome.generations_run;
        let extracted = extract(problem, parameters, &outcome);
        let (status, error) = if was_timed_out {
            ("failed", Some("timeout".to_string()))
        } else if was_cancelled {
            ("cancelled", None)
        } else {
            ("completed", None)
        };
        ScenarioRecord {
            scenario_id: scenario_id.as_str().to_string(),
            owner: owner.as_str().to_string(),
            status: status.into(),
            error,
            generations_run,
            result: Some(extracted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::InMemoryCheckpointStore;
    use cdst_core::ids::{AreaIndex, LabIndex, TestIndex};
    use cdst_solver::{LabCapacity, ObjectiveWeights, Parameters, ProblemBuilder};

    fn tiny_problem() -> cdst_solver::Problem {
        ProblemBuilder::new(1, 1, 1)
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
            .build()
    }

    fn quick_parameters() -> Parameters {
        let mut parameters = Parameters::default();
        parameters.algorithm.population_size = 4;
        parameters.algorithm.max_generations = 3;
        parameters.algorithm.elite_size = 1;
        parameters.algorithm.random_seed = Some(1);
        parameters.weights = ObjectiveWeights::default();
        parameters
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn submitted_scenario_completes() {
        let scheduler = Scheduler::new(SchedulerConfig::default(), Arc::new(InMemoryCheckpointStore::default()));
        let job = ScenarioJob {
            scenario_id: ScenarioId::new("run-1"),
            owner: OwnerId::new("alice"),
            problem: tiny_problem(),
            parameters: quick_parameters(),
        };
        let id = job.scenario_id.clone();
        let mut rx = scheduler.submit(job);

        for _ in 0..200 {
            if scheduler.status(&id) == Some(ScenarioStatus::Completed) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(scheduler.status(&id), Some(ScenarioStatus::Completed));
        let record = scheduler.record(&id).unwrap();
        assert_eq!(record.status, "completed");
        assert!(record.result.is_some());
        let _ = rx.changed().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelling_a_pending_scenario_skips_it() {
        let mut config = SchedulerConfig::default();
        config.max_global = 1;
        let scheduler = Scheduler::new(config, Arc::new(InMemoryCheckpointStore::default()));

        let blocker = ScenarioJob {
            scenario_id: ScenarioId::new("blocker"),
            owner: OwnerId::new("alice"),
            problem: tiny_problem(),
            parameters: {
                let mut p = quick_parameters();
                p.algorithm.max_generations = 50;
                p
            },
        };
        scheduler.submit(blocker);

        let queued = ScenarioJob {
            scenario_id: ScenarioId::new("queued"),
            owner: OwnerId::new("bob"),
            problem: tiny_problem(),
            parameters: quick_parameters(),
        };
        let queued_id = queued.scenario_id.clone();
        scheduler.submit(queued);

        assert_eq!(scheduler.status(&queued_id), Some(ScenarioStatus::Pending));
        scheduler.cancel(&queued_id).unwrap();
        assert_eq!(scheduler.status(&queued_id), Some(ScenarioStatus::Cancelled));
        // Idempotent: a second cancel of a terminal scenario is a no-op.
        scheduler.cancel(&queued_id).unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancelling_a_running_scenario_keeps_its_best_so_far_result() {
        let scheduler = Scheduler::new(SchedulerConfig::default(), Arc::new(InMemoryCheckpointStore::default()));
        let job = ScenarioJob {
            scenario_id: ScenarioId::new("long-run"),
            owner: OwnerId::new("alice"),
            problem: tiny_problem(),
            parameters: {
                let mut p = quick_parameters();
                p.algorithm.max_generations = 100_000;
                p.algorithm.convergence_window = 1_000_000;
                p.algorithm.time_budget_seconds = None;
                p
            },
        };
        let id = job.scenario_id.clone();
        let mut rx = scheduler.submit(job);

        while rx.borrow().is_none() {
            if rx.changed().await.is_err() {
                break;
            }
        }
        scheduler.cancel(&id).unwrap();

        for _ in 0..500 {
            if scheduler.status(&id) == Some(ScenarioStatus::Cancelled) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(scheduler.status(&id), Some(ScenarioStatus::Cancelled));
        let record = scheduler.record(&id).unwrap();
        assert_eq!(record.status, "cancelled");
        assert!(record.result.is_some(), "a cancelled run still stores its best-so-far front");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn timed_out_scenario_fails_with_a_timeout_error_but_keeps_its_result() {
        let mut config = SchedulerConfig::default();
        config.timeout = Duration::from_millis(200);
        let scheduler = Scheduler::new(config, Arc::new(InMemoryCheckpointStore::default()));
        let job = ScenarioJob {
            scenario_id: ScenarioId::new("slow"),
            owner: OwnerId::new("alice"),
            problem: tiny_problem(),
            parameters: {
                let mut p = quick_parameters();
                p.algorithm.max_generations = 1_000_000;
                p.algorithm.convergence_window = 1_000_000;
                p.algorithm.time_budget_seconds = None;
                p
            },
        };
        let id = job.scenario_id.clone();
        scheduler.submit(job);

        for _ in 0..500 {
            if scheduler.status(&id).map(|s| s.is_terminal()).unwrap_or(false) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let record = scheduler.record(&id).unwrap();
        assert_eq!(record.status, "failed");
        assert_eq!(record.error.as_deref(), Some("timeout"));
        assert!(record.result.is_some(), "a timed-out run still stores its best-so-far front");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreadable_checkpoint_fails_the_scenario_instead_of_restarting() {
        let store = Arc::new(InMemoryCheckpointStore::default());
        let id = ScenarioId::new("resume-bad");
        store
            .save(
                &id,
                &CheckpointData {
                    scenario_id: "resume-bad".into(),
                    generation: 7,
                    best_composite: 0.0,
                    population_json: "not json".into(),
                },
            )
            .unwrap();
        let scheduler = Scheduler::new(SchedulerConfig::default(), store);
        let job = ScenarioJob {
            scenario_id: id.clone(),
            owner: OwnerId::new("alice"),
            problem: tiny_problem(),
            parameters: quick_parameters(),
        };
        scheduler.submit(job);

        for _ in 0..200 {
            if scheduler.status(&id).map(|s| s.is_terminal()).unwrap_or(false) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let record = scheduler.record(&id).unwrap();
        assert_eq!(record.status, "failed");
        assert!(record.error.unwrap().contains("unreadable checkpoint"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn readable_checkpoint_seeds_the_resumed_run() {
        use cdst_solver::{AllocationTensor, Individual};

        let store = Arc::new(InMemoryCheckpointStore::default());
        let id = ScenarioId::new("resume-ok");
        let mut seed = AllocationTensor::zeros(1, 1, 1);
        seed.set(AreaIndex::new(0), LabIndex::new(0), TestIndex::new(0), 5);
        let population = vec![Individual::new(seed)];
        store
            .save(
                &id,
                &CheckpointData {
                    scenario_id: "resume-ok".into(),
                    generation: 7,
                    best_composite: 0.0,
                    population_json: serde_json::to_string(&population).unwrap(),
                },
            )
            .unwrap();
        let scheduler = Scheduler::new(SchedulerConfig::default(), store);
        let job = ScenarioJob {
            scenario_id: id.clone(),
            owner: OwnerId::new("alice"),
            problem: tiny_problem(),
            parameters: quick_parameters(),
        };
        scheduler.submit(job);

        for _ in 0..200 {
            if scheduler.status(&id) == Some(ScenarioStatus::Completed) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let record = scheduler.record(&id).unwrap();
        assert_eq!(record.status, "completed");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn per_user_cap_queues_a_fourth_concurrent_scenario() {
        let mut config = SchedulerConfig::default();
        config.max_per_user = 1;
        config.max_global = 4;
        let scheduler = Scheduler::new(config, Arc::new(InMemoryCheckpointStore::default()));

        let first = ScenarioJob {
            scenario_id: ScenarioId::new("first"),
            owner: OwnerId::new("alice"),
            problem: tiny_problem(),
            parameters: {
                let mut p = quick_parameters();
                p.algorithm.max_generations = 50;
                p
            },
        };
        scheduler.submit(first);

        let second = ScenarioJob {
            scenario_id: ScenarioId::new("second"),
            owner: OwnerId::new("alice"),
            problem: tiny_problem(),
            parameters: quick_parameters(),
        };
        let second_id = second.scenario_id.clone();
        scheduler.submit(second);

        assert_eq!(scheduler.status(&second_id), Some(ScenarioStatus::Pending));
    }
}
