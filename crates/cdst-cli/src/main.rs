mod cli;
mod config;

use anyhow::{anyhow, Context, Result};
use cdst_core::ids::{OwnerId, ScenarioId};
use cdst_routing::{HttpRoutingClient, Provider, ProviderConfig, RoutingClient};
use cdst_scenarios::{
    build_problem, load_spec_from_path, materialize_scenarios, resolve_scenarios, DemandWindow,
    NetworkSnapshot, ScenarioApplyOptions,
};
use cdst_scheduler::{FileCheckpointStore, ScenarioJob, ScenarioRpc, Scheduler, SchedulerConfig};
use cdst_solver::Parameters;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::Parser;
use cli::{Cli, Commands, ConfigCommands};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(cli.log_level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    configure_threads(&cli.threads);

    let result = match &cli.command {
        Commands::Run { .. } => run_command(&cli).await,
        Commands::Batch { .. } => batch_command(&cli).await,
        Commands::Config { command } => config_command(command),
    };

    if let Err(err) = result {
        error!(error = %err, "command failed");
        std::process::exit(1);
    }
}

/// Size the global rayon pool distance resolution and fitness evaluation
/// both run on. `"auto"` (the default) uses every available core.
fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = rayon::ThreadPoolBuilder::new().num_threads(count).build_global();
}

fn load_snapshot(path: &Path) -> Result<NetworkSnapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading network snapshot '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing network snapshot '{}'", path.display()))
}

fn parse_window(start: &Option<String>, end: &Option<String>) -> Result<DemandWindow> {
    let end = match end {
        Some(s) => DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc),
        None => Utc::now(),
    };
    let start = match start {
        Some(s) => DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc),
        None => end - ChronoDuration::days(30),
    };
    Ok(DemandWindow { start, end })
}

fn build_provider(cfg: &config::RoutingConfig) -> Provider {
    let client: Option<Arc<dyn RoutingClient>> = cfg
        .base_url
        .as_ref()
        .map(|url| Arc::new(HttpRoutingClient::new(url.clone(), Duration::from_millis(cfg.timeout_ms))) as Arc<dyn RoutingClient>);
    let provider_config = ProviderConfig {
        cache_ttl: Duration::from_secs(cfg.cache_ttl_hours * 3600),
        ..ProviderConfig::default()
    };
    Provider::new(client, provider_config)
}

fn scheduler_config(cfg: &config::CdstConfig) -> SchedulerConfig {
    SchedulerConfig {
        max_per_user: cfg.scheduler.max_per_user,
        max_global: cfg.scheduler.max_global,
        checkpoint_every_generations: cfg.scheduler.checkpoint_every_generations,
        timeout: Duration::from_secs(cfg.optimization.timeout_secs),
    }
}

fn build_scheduler(cfg: &config::CdstConfig) -> Result<Scheduler> {
    let store = Arc::new(FileCheckpointStore::new(config::checkpoint_dir()?)?);
    Ok(Scheduler::new(scheduler_config(cfg), store))
}

/// Run parameters assembled from the config file's optimization defaults,
/// before any per-invocation CLI overrides.
fn base_parameters(cfg: &config::CdstConfig) -> Parameters {
    let mut parameters = Parameters::default();
    parameters.algorithm.population_size = cfg.optimization.population_size;
    parameters.algorithm.max_generations = cfg.optimization.max_generations;
    parameters.algorithm.time_budget_seconds = Some(cfg.optimization.timeout_secs as f64);
    parameters
}

async fn await_terminal(scheduler: &Scheduler, id: &ScenarioId, timeout_secs: Option<u64>) -> Result<()> {
    let deadline = timeout_secs.map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));
    loop {
        let status = scheduler
            .scenario_status(id)
            .ok_or_else(|| anyhow!("scenario '{}' has no handle", id.as_str()))?;
        if status.is_terminal() {
            return Ok(());
        }
        if let Some(deadline) = deadline {
            if tokio::time::Instant::now() >= deadline {
                warn!(scenario = %id.as_str(), "timeout reached, cancelling");
                scheduler.cancel_scenario(id)?;
            }
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

async fn run_command(cli: &Cli) -> Result<()> {
    let Commands::Run {
        snapshot,
        scenario_id,
        owner,
        demand_start,
        demand_end,
        population_size,
        max_generations,
        seed,
        timeout_secs,
        out,
    } = &cli.command
    else {
        unreachable!("run_command called with a non-Run command")
    };

    let cfg = config::load_config(cli.config.as_ref())?;
    let network = load_snapshot(snapshot)?;
    let window = parse_window(demand_start, demand_end)?;
    let provider = build_provider(&cfg.routing);
    let problem = build_problem(&network, window, &provider)?;

    let mut parameters = base_parameters(&cfg);
    if let Some(n) = population_size {
        parameters.algorithm.population_size = *n;
    }
    if let Some(n) = max_generations {
        parameters.algorithm.max_generations = *n;
    }
    if let Some(s) = seed {
        parameters.algorithm.random_seed = Some(*s);
    }
    if parameters.algorithm.elite_size >= parameters.algorithm.population_size {
        // A small exploratory run shouldn't be rejected because the default
        // elite count was tuned for the default population size.
        parameters.algorithm.elite_size = (parameters.algorithm.population_size / 10).max(1);
    }
    parameters.validate().map_err(|e| anyhow!(e.to_string()))?;

    let scheduler = build_scheduler(&cfg)?;
    let id = ScenarioId::new(scenario_id.clone());
    let job = ScenarioJob {
        scenario_id: id.clone(),
        owner: OwnerId::new(owner.clone()),
        problem,
        parameters,
    };
    let mut progress = scheduler.run_scenario(job);

    let watcher = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            if let Some(report) = progress.borrow().clone() {
                info!(
                    generation = report.generation,
                    best = report.best_composite,
                    mean = report.mean_composite,
                    front_zero = report.front_zero_size,
                    "generation complete"
                );
            }
        }
    });

    await_terminal(&scheduler, &id, *timeout_secs).await?;
    // The scheduler keeps the progress sender alive for late subscribers,
    // so the watcher never sees a closed channel; stop it explicitly.
    watcher.abort();

    let record = scheduler
        .get_result(&id)
        .ok_or_else(|| anyhow!("scenario '{}' finished without a record", id.as_str()))?;
    let rendered = serde_json::to_string_pretty(&record)?;
    match out {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }
    if record.status == "completed" {
        info!(scenario = scenario_id.as_str(), "run complete");
        Ok(())
    } else {
        Err(anyhow!("scenario '{}' ended in status '{}'", scenario_id, record.status))
    }
}

async fn batch_command(cli: &Cli) -> Result<()> {
    let Commands::Batch {
        snapshot,
        scenario_spec,
        owner,
        out_dir,
    } = &cli.command
    else {
        unreachable!("batch_command called with a non-Batch command")
    };

    let cfg = config::load_config(cli.config.as_ref())?;
    let base = load_snapshot(snapshot)?;
    let spec_set = load_spec_from_path(scenario_spec)?;
    let scenarios = resolve_scenarios(&spec_set)?;
    if scenarios.is_empty() {
        return Err(anyhow!("scenario spec '{}' resolved to zero scenarios", scenario_spec.display()));
    }

    let provider = build_provider(&cfg.routing);
    let scheduler = build_scheduler(&cfg)?;
    let window = parse_window(&None, &None)?;
    let apply_opts = ScenarioApplyOptions::default();

    // Each scenario's varied snapshot is written under out_dir (plus a
    // manifest tying them together) before any run starts, so the exact
    // inputs of a batch survive next to its results.
    let artifacts = materialize_scenarios(&base, out_dir, &scenarios, &apply_opts)?;

    let mut ids = Vec::with_capacity(artifacts.len());
    for artifact in &artifacts {
        let varied = load_snapshot(Path::new(&artifact.snapshot_path))?;
        let problem = build_problem(&varied, window, &provider)?;
        let parameters = base_parameters(&cfg);
        let id = ScenarioId::new(artifact.scenario_id.clone());
        let job = ScenarioJob {
            scenario_id: id.clone(),
            owner: OwnerId::new(owner.clone()),
            problem,
            parameters,
        };
        scheduler.run_scenario(job);
        ids.push(id);
    }

    for id in &ids {
        await_terminal(&scheduler, id, None).await?;
    }

    let mut summary = Vec::with_capacity(ids.len());
    for id in &ids {
        let record = scheduler
            .get_result(id)
            .ok_or_else(|| anyhow!("scenario '{}' finished without a record", id.as_str()))?;
        let scenario_dir = out_dir.join(sanitize(id.as_str()));
        std::fs::create_dir_all(&scenario_dir)?;
        std::fs::write(scenario_dir.join("result.json"), serde_json::to_string_pretty(&record)?)?;
        summary.push(record);
    }

    let completed = summary.iter().filter(|r| r.status == "completed").count();
    info!(completed, total = summary.len(), "batch finished");
    println!("{} of {} scenarios completed, results under {}", completed, summary.len(), out_dir.display());
    Ok(())
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn config_command(command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Init => {
            let path = config::save_default_config()?;
            println!("wrote default config to {}", path.display());
        }
        ConfigCommands::Path => {
            println!("{}", config::config_path()?.display());
        }
    }
    Ok(())
}
