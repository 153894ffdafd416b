//! Scenario manifest: materialize every scenario in a set against a base
//! snapshot and record what was produced, so a later run can pick up the
//! written snapshots without re-deriving them.

use crate::apply::{apply_scenario_to_snapshot, ScenarioApplyOptions};
use crate::snapshot::NetworkSnapshot;
use crate::spec::ResolvedScenario;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioArtifact {
    pub scenario_id: String,
    pub description: Option<String>,
    pub snapshot_path: String,
    pub demand_scale: f64,
    pub capacity_scale: f64,
    pub weight: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Apply every resolved scenario to `base`, write each scenario-specific
/// snapshot under `out_dir/<scenario_id>/snapshot.json`, and write a
/// manifest summarizing all of them.
pub fn materialize_scenarios(
    base: &NetworkSnapshot,
    out_dir: &Path,
    scenarios: &[ResolvedScenario],
    options: &ScenarioApplyOptions,
) -> Result<Vec<ScenarioArtifact>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating scenario output directory '{}'", out_dir.display()))?;
    let mut artifacts = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let snapshot = apply_scenario_to_snapshot(base, scenario, options);
        let scenario_dir = out_dir.join(sanitize_name(&scenario.scenario_id));
        fs::create_dir_all(&scenario_dir)
            .with_context(|| format!("creating scenario directory '{}'", scenario_dir.display()))?;
        let snapshot_path = scenario_dir.join("snapshot.json");
        let file = File::create(&snapshot_path)
            .with_context(|| format!("creating snapshot '{}'", snapshot_path.display()))?;
        serde_json::to_writer_pretty(file, &snapshot)
            .with_context(|| format!("writing snapshot '{}'", snapshot_path.display()))?;
        artifacts.push(ScenarioArtifact {
            scenario_id: scenario.scenario_id.clone(),
            description: scenario.description.clone(),
            snapshot_path: snapshot_path.display().to_string(),
            demand_scale: scenario.demand_scale,
            capacity_scale: scenario.capacity_scale,
            weight: scenario.weight,
            tags: scenario.tags.clone(),
            metadata: scenario.metadata.clone(),
        });
    }
    let manifest_path = out_dir.join("scenario_manifest.json");
    write_manifest(&manifest_path, &artifacts)?;
    Ok(artifacts)
}

pub fn write_manifest(path: &Path, artifacts: &[ScenarioArtifact]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating scenario manifest '{}'", path.display()))?;
    serde_json::to_writer_pretty(file, artifacts)
        .with_context(|| format!("writing scenario manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_manifest(path: &Path) -> Result<Vec<ScenarioArtifact>> {
    let file = File::open(path).with_context(|| format!("opening scenario manifest '{}'", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("parsing scenario manifest '{}'", path.display()))
}

fn sanitize_name(value: &str) -> String {
    let filtered: String = value.chars().map(|c| if matches!(c, '/' | '\\') { '_' } else { c }).collect();
    if filtered.is_empty() {
        "scenario".to_string()
    } else {
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::AreaRecord;
    use crate::spec::OutageSpec;
    use tempfile::tempdir;

    fn base() -> NetworkSnapshot {
        NetworkSnapshot {
            areas: vec![AreaRecord {
                id: "area-1".into(),
                lat: 0.0,
                lng: 0.0,
                population: 10.0,
            }],
            ..Default::default()
        }
    }

    fn resolved(id: &str) -> ResolvedScenario {
        ResolvedScenario {
            scenario_id: id.into(),
            description: Some("desc".into()),
            tags: vec!["peak".into()],
            outages: vec![OutageSpec::Lab { id: "lab-x".into() }],
            demand_scale: 1.2,
            capacity_scale: 1.0,
            weight: 1.0,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn materialize_writes_a_snapshot_and_manifest_per_scenario() {
        let dir = tempdir().unwrap();
        let artifacts = materialize_scenarios(
            &base(),
            dir.path(),
            &[resolved("surge")],
            &ScenarioApplyOptions::default(),
        )
        .unwrap();
        assert_eq!(artifacts.len(), 1);
        assert!(Path::new(&artifacts[0].snapshot_path).exists());
        assert!(dir.path().join("scenario_manifest.json").exists());
    }

    #[test]
    fn write_then_load_manifest_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let artifact = ScenarioArtifact {
            scenario_id: "surge".into(),
            description: None,
            snapshot_path: "snapshot.json".into(),
            demand_scale: 1.0,
            capacity_scale: 1.0,
            weight: 1.0,
            tags: vec![],
            metadata: HashMap::new(),
        };
        write_manifest(&path, &[artifact]).unwrap();
        let loaded = load_manifest(&path).unwrap();
        assert_eq!(loaded[0].scenario_id, "surge");
    }
}
