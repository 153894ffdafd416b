use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Culture and drug sensitivity testing workload allocator", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Path to a config file (defaults to ~/.cdst/config/cdst.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Size of the rayon thread pool used for distance resolution and
    /// fitness evaluation ("auto" uses all available cores)
    #[arg(long, default_value = "auto", global = true)]
    pub threads: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a problem from a network snapshot and evolve an allocation
    Run {
        /// Path to a network snapshot (JSON)
        snapshot: PathBuf,
        /// Scenario identifier, used for checkpointing and the printed record
        #[arg(long, default_value = "run")]
        scenario_id: String,
        /// Owner tag, used for the scheduler's per-user admission cap
        #[arg(long, default_value = "local")]
        owner: String,
        /// Demand window start, RFC 3339 (defaults to 30 days before end)
        #[arg(long)]
        demand_start: Option<String>,
        /// Demand window end, RFC 3339 (defaults to now)
        #[arg(long)]
        demand_end: Option<String>,
        /// Override the default population size
        #[arg(long)]
        population_size: Option<usize>,
        /// Override the default generation cap
        #[arg(long)]
        max_generations: Option<usize>,
        /// Fix the RNG seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        /// Cancel the run after this many seconds, regardless of convergence
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Write the extracted result to this path instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Materialize a scenario spec's variations against a base snapshot,
    /// then run each one
    Batch {
        /// Path to the base network snapshot (JSON)
        snapshot: PathBuf,
        /// Path to a scenario spec (YAML or JSON)
        scenario_spec: PathBuf,
        /// Owner tag shared by every scenario in the batch
        #[arg(long, default_value = "local")]
        owner: String,
        /// Directory to materialize per-scenario snapshots and results into
        #[arg(long, default_value = "cdst-batch-out")]
        out_dir: PathBuf,
    },
    /// Configuration file management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a default config file if one doesn't already exist
    Init,
    /// Print the resolved config file path
    Path,
}
