//! Scenario spec: a named variation on a network snapshot (demand/capacity
//! scaling, lab or capability outages), resolved against a defaults block
//! so individual scenarios only state what they change.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub version: Option<u32>,
    #[serde(default)]
    pub defaults: ScenarioDefaults,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefaults {
    #[serde(default = "default_scale")]
    pub demand_scale: f64,
    #[serde(default = "default_scale")]
    pub capacity_scale: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_scale() -> f64 {
    1.0
}

fn default_weight() -> f64 {
    1.0
}

impl Default for ScenarioDefaults {
    fn default() -> Self {
        Self {
            demand_scale: default_scale(),
            capacity_scale: default_scale(),
            weight: default_weight(),
            tags: Vec::new(),
            metadata: HashMap::new(),
        }
    }
}

/// A lab or test taken out of service for this scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutageSpec {
    Lab { id: String },
    Capability { lab_id: String, test_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub scenario_id: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub outages: Vec<OutageSpec>,
    pub demand_scale: Option<f64>,
    pub capacity_scale: Option<f64>,
    pub weight: Option<f64>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedScenario {
    pub scenario_id: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub outages: Vec<OutageSpec>,
    pub demand_scale: f64,
    pub capacity_scale: f64,
    pub weight: f64,
    pub metadata: HashMap<String, String>,
}

/// Read a scenario file, sniffing the format from the content rather than
/// the extension: a spec piped through tooling often arrives with no
/// useful suffix, and a JSON document is recognizable from its first
/// non-whitespace byte.
pub fn load_spec_from_path(path: &Path) -> Result<ScenarioSet> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading scenario file '{}'", path.display()))?;
    if data.trim_start().starts_with('{') {
        serde_json::from_str(&data)
            .with_context(|| format!("parsing scenario file '{}' as json", path.display()))
    } else {
        serde_yaml::from_str(&data)
            .with_context(|| format!("parsing scenario file '{}' as yaml", path.display()))
    }
}

impl ScenarioSpec {
    /// Fill unset knobs from `defaults` and check the result makes sense
    /// for a lab network: an id to run under, finite non-negative scale
    /// factors (a scale of zero is a legitimate "no demand"/"no capacity"
    /// stress case; a negative one is meaningless), a positive weight, and
    /// outages that actually name the lab or `(lab, test)` capability they
    /// take out.
    fn resolve(&self, defaults: &ScenarioDefaults) -> Result<ResolvedScenario> {
        let id = self.scenario_id.trim();
        if id.is_empty() {
            return Err(anyhow!("a scenario in the file has a blank id"));
        }

        let demand_scale = self.demand_scale.unwrap_or(defaults.demand_scale);
        let capacity_scale = self.capacity_scale.unwrap_or(defaults.capacity_scale);
        for (knob, value) in [("demand_scale", demand_scale), ("capacity_scale", capacity_scale)] {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!(
                    "scenario '{id}': {knob} must be a finite non-negative factor, got {value}"
                ));
            }
        }
        let weight = self.weight.unwrap_or(defaults.weight);
        if !value_is_positive(weight) {
            return Err(anyhow!("scenario '{id}': weight must be positive, got {weight}"));
        }

        for outage in &self.outages {
            match outage {
                OutageSpec::Lab { id: lab_id } => {
                    if lab_id.trim().is_empty() {
                        return Err(anyhow!("scenario '{id}': lab outage names no lab"));
                    }
                }
                OutageSpec::Capability { lab_id, test_id } => {
                    if lab_id.trim().is_empty() || test_id.trim().is_empty() {
                        return Err(anyhow!(
                            "scenario '{id}': capability outage must name both a lab and a test"
                        ));
                    }
                }
            }
        }

        Ok(ResolvedScenario {
            scenario_id: id.to_string(),
            description: self.description.clone(),
            tags: self.tags.clone().unwrap_or_else(|| defaults.tags.clone()),
            outages: self.outages.clone(),
            demand_scale,
            capacity_scale,
            weight,
            metadata: self
                .metadata
                .clone()
                .unwrap_or_else(|| defaults.metadata.clone()),
        })
    }
}

fn value_is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

pub fn resolve_scenarios(set: &ScenarioSet) -> Result<Vec<ResolvedScenario>> {
    if set.scenarios.is_empty() {
        return Err(anyhow!("scenario file lists no scenarios to run"));
    }
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(set.scenarios.len());
    for spec in &set.scenarios {
        let scenario = spec.resolve(&set.defaults)?;
        if !seen.insert(scenario.scenario_id.clone()) {
            return Err(anyhow!(
                "scenario id '{}' is used more than once",
                scenario.scenario_id
            ));
        }
        resolved.push(scenario);
    }
    Ok(resolved)
}

pub fn validate(set: &ScenarioSet) -> Result<()> {
    resolve_scenarios(set).map(|_| ())
}
