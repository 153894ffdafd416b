//! Home directory and configuration file under `~/.cdst/config/cdst.toml`.
//!
//! Environment variables override the file: `OPTIMIZATION_POPULATION_SIZE`,
//! `OPTIMIZATION_MAX_GENERATIONS`, `OPTIMIZATION_TIMEOUT` (seconds),
//! `ROUTING_BASE_URL`, `ROUTING_TIMEOUT_MS`, `ROUTING_CACHE_TTL_HOURS`.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CdstConfig {
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub optimization: OptimizationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// OSRM-style base URL; `None` means resolve with the haversine
    /// fallback backend only.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_timeout_ms(),
            cache_ttl_hours: default_cache_ttl_hours(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_cache_ttl_hours() -> u64 {
    24
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_max_per_user")]
    pub max_per_user: usize,
    #[serde(default = "default_max_global")]
    pub max_global: usize,
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every_generations: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_per_user: default_max_per_user(),
            max_global: default_max_global(),
            checkpoint_every_generations: default_checkpoint_every(),
        }
    }
}

fn default_max_per_user() -> usize {
    3
}

fn default_max_global() -> usize {
    4
}

fn default_checkpoint_every() -> usize {
    50
}

/// Defaults for the optimization knobs a run doesn't override explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationSettings {
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Per-scenario wall-clock cap, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            max_generations: default_max_generations(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_population_size() -> usize {
    200
}

fn default_max_generations() -> usize {
    500
}

fn default_timeout_secs() -> u64 {
    900
}

/// `~/.cdst`
pub fn cdst_home() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| anyhow!("cannot determine home directory"))
        .map(|h| h.join(".cdst"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(cdst_home()?.join("config").join("cdst.toml"))
}

pub fn checkpoint_dir() -> Result<PathBuf> {
    Ok(cdst_home()?.join("checkpoints"))
}

fn env_parsed<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse().ok())
}

fn apply_env_overrides(config: &mut CdstConfig) {
    if let Some(value) = env_parsed("OPTIMIZATION_POPULATION_SIZE") {
        config.optimization.population_size = value;
    }
    if let Some(value) = env_parsed("OPTIMIZATION_MAX_GENERATIONS") {
        config.optimization.max_generations = value;
    }
    if let Some(value) = env_parsed("OPTIMIZATION_TIMEOUT") {
        config.optimization.timeout_secs = value;
    }
    if let Ok(url) = std::env::var("ROUTING_BASE_URL") {
        if !url.trim().is_empty() {
            config.routing.base_url = Some(url);
        }
    }
    if let Some(value) = env_parsed("ROUTING_TIMEOUT_MS") {
        config.routing.timeout_ms = value;
    }
    if let Some(value) = env_parsed("ROUTING_CACHE_TTL_HOURS") {
        config.routing.cache_ttl_hours = value;
    }
}

/// Load the config file if present, falling back to defaults, then apply
/// environment overrides on top. Never creates the file: `cdst config
/// init` does that explicitly.
pub fn load_config(explicit_path: Option<&PathBuf>) -> Result<CdstConfig> {
    let path = match explicit_path {
        Some(p) => p.clone(),
        None => config_path()?,
    };
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents)?
    } else {
        CdstConfig::default()
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

pub fn save_default_config() -> Result<PathBuf> {
    let path = config_path()?;
    let dir = path.parent().unwrap();
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, toml::to_string_pretty(&CdstConfig::default())?)?;
    Ok(path)
}
