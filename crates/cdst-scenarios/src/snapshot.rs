//! Network snapshot: the raw, externally-keyed input the Problem Builder
//! resolves into a dense [`cdst_solver::Problem`] — area, lab, test,
//! capability, and demand tables keyed by whatever identifiers the
//! upstream system uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A service area: a population center with demand for tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaRecord {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub population: f64,
}

/// A laboratory capable of performing some subset of test types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabRecord {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub max_per_day: u32,
    pub max_per_month: u32,
    pub staff_count: u32,
    pub util_factor: f64,
    pub monthly_overhead: f64,
    /// Minutes open each weekday, Monday first.
    pub weekday_hours_minutes: [f64; 7],
}

/// A test type a lab may be capable of running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRecord {
    pub id: String,
}

/// One lab's capability to run one test type, with its technical and cost
/// parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityRecord {
    pub lab_id: String,
    pub test_id: String,
    pub proc_time_minutes: f64,
    pub staff_required: f64,
    pub equipment_utilization: f64,
    pub cost_per_test: f64,
    pub quality_score: f64,
}

/// Raw demand observation: `count` tests of `test_id` requested from
/// `area_id` at `observed_at`. The Problem Builder aggregates these over a
/// caller-supplied date window into the dense `demand[a,t]` matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandRecord {
    pub area_id: String,
    pub test_id: String,
    pub observed_at: DateTime<Utc>,
    pub count: u32,
}

/// Everything the Problem Builder needs: areas, labs, tests, capabilities,
/// and raw demand observations, all still externally keyed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub areas: Vec<AreaRecord>,
    pub labs: Vec<LabRecord>,
    pub tests: Vec<TestRecord>,
    pub capabilities: Vec<CapabilityRecord>,
    pub demand: Vec<DemandRecord>,
    pub cost_per_km: f64,
    pub max_acceptable_distance_km: f64,
}
