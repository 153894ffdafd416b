//! Apply a resolved scenario to a network snapshot: strip outaged labs or
//! capabilities first, then scale demand and capacity.

use crate::snapshot::NetworkSnapshot;
use crate::spec::{OutageSpec, ResolvedScenario};

#[derive(Debug, Clone)]
pub struct ScenarioApplyOptions {
    pub drop_outaged_elements: bool,
}

impl Default for ScenarioApplyOptions {
    fn default() -> Self {
        Self {
            drop_outaged_elements: true,
        }
    }
}

/// Apply `scenario` to a clone of `base`, returning the scenario-specific
/// snapshot. `base` is left untouched so the same baseline can be reused
/// across many scenarios.
pub fn apply_scenario_to_snapshot(
    base: &NetworkSnapshot,
    scenario: &ResolvedScenario,
    opts: &ScenarioApplyOptions,
) -> NetworkSnapshot {
    let mut snapshot = base.clone();

    if opts.drop_outaged_elements {
        for outage in &scenario.outages {
            match outage {
                OutageSpec::Lab { id } => {
                    snapshot.labs.retain(|lab| &lab.id != id);
                    snapshot.capabilities.retain(|cap| &cap.lab_id != id);
                }
                OutageSpec::Capability { lab_id, test_id } => {
                    snapshot
                        .capabilities
                        .retain(|cap| !(&cap.lab_id == lab_id && &cap.test_id == test_id));
                }
            }
        }
    }

    for demand in &mut snapshot.demand {
        demand.count = ((demand.count as f64) * scenario.demand_scale).round().max(0.0) as u32;
    }
    for lab in &mut snapshot.labs {
        lab.max_per_day = ((lab.max_per_day as f64) * scenario.capacity_scale).round().max(0.0) as u32;
        lab.max_per_month = ((lab.max_per_month as f64) * scenario.capacity_scale).round().max(0.0) as u32;
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{AreaRecord, CapabilityRecord, LabRecord, TestRecord};

    fn base_snapshot() -> NetworkSnapshot {
        NetworkSnapshot {
            areas: vec![AreaRecord {
                id: "area-1".into(),
                lat: 0.0,
                lng: 0.0,
                population: 100.0,
            }],
            labs: vec![
                LabRecord {
                    id: "lab-1".into(),
                    lat: 0.0,
                    lng: 0.0,
                    max_per_day: 100,
                    max_per_month: 1000,
                    staff_count: 2,
                    util_factor: 1.0,
                    monthly_overhead: 0.0,
                    weekday_hours_minutes: [480.0; 7],
                },
                LabRecord {
                    id: "lab-2".into(),
                    lat: 0.0,
                    lng: 0.0,
                    max_per_day: 100,
                    max_per_month: 1000,
                    staff_count: 2,
                    util_factor: 1.0,
                    monthly_overhead: 0.0,
                    weekday_hours_minutes: [480.0; 7],
                },
            ],
            tests: vec![TestRecord { id: "test-1".into() }],
            capabilities: vec![
                CapabilityRecord {
                    lab_id: "lab-1".into(),
                    test_id: "test-1".into(),
                    proc_time_minutes: 10.0,
                    staff_required: 1.0,
                    equipment_utilization: 0.5,
                    cost_per_test: 1.0,
                    quality_score: 1.0,
                },
                CapabilityRecord {
                    lab_id: "lab-2".into(),
                    test_id: "test-1".into(),
                    proc_time_minutes: 10.0,
                    staff_required: 1.0,
                    equipment_utilization: 0.5,
                    cost_per_test: 1.0,
                    quality_score: 1.0,
                },
            ],
            demand: vec![],
            cost_per_km: 1.0,
            max_acceptable_distance_km: 50.0,
        }
    }

    fn resolved(outages: Vec<OutageSpec>, demand_scale: f64, capacity_scale: f64) -> ResolvedScenario {
        ResolvedScenario {
            scenario_id: "s".into(),
            description: None,
            tags: vec![],
            outages,
            demand_scale,
            capacity_scale,
            weight: 1.0,
            metadata: Default::default(),
        }
    }

    #[test]
    fn lab_outage_removes_lab_and_its_capabilities() {
        let base = base_snapshot();
        let scenario = resolved(vec![OutageSpec::Lab { id: "lab-1".into() }], 1.0, 1.0);
        let applied = apply_scenario_to_snapshot(&base, &scenario, &ScenarioApplyOptions::default());
        assert_eq!(applied.labs.len(), 1);
        assert!(applied.capabilities.iter().all(|c| c.lab_id != "lab-1"));
    }

    #[test]
    fn capacity_scale_multiplies_max_per_day() {
        let base = base_snapshot();
        let scenario = resolved(vec![], 1.0, 0.5);
        let applied = apply_scenario_to_snapshot(&base, &scenario, &ScenarioApplyOptions::default());
        assert_eq!(applied.labs[0].max_per_day, 50);
    }

    #[test]
    fn base_snapshot_is_not_mutated() {
        let base = base_snapshot();
        let scenario = resolved(vec![OutageSpec::Lab { id: "lab-1".into() }], 1.0, 1.0);
        apply_scenario_to_snapshot(&base, &scenario, &ScenarioApplyOptions::default());
        assert_eq!(base.labs.len(), 2);
    }
}
