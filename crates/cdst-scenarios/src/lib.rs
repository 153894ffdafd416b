//! # cdst-scenarios: Problem Builder and scenario variation management
//!
//! Validates externally-keyed [`snapshot::NetworkSnapshot`]s into dense
//! [`cdst_solver::Problem`]s, and resolves/applies named scenario
//! variations (demand surges, lab outages) on top of a baseline snapshot
//! before building.

pub mod apply;
pub mod builder;
pub mod manifest;
pub mod snapshot;
pub mod spec;

pub use apply::{apply_scenario_to_snapshot, ScenarioApplyOptions};
pub use builder::{build_problem, DemandWindow};
pub use manifest::{load_manifest, materialize_scenarios, write_manifest, ScenarioArtifact};
pub use snapshot::{AreaRecord, CapabilityRecord, DemandRecord, LabRecord, NetworkSnapshot, TestRecord};
pub use spec::{load_spec_from_path, resolve_scenarios, validate, OutageSpec, ResolvedScenario, ScenarioDefaults, ScenarioSet, ScenarioSpec};
