//! Problem Builder: validates a [`NetworkSnapshot`] and resolves it into a
//! dense [`cdst_solver::Problem`], assigning 0-based indices in order of
//! first appearance.

use crate::snapshot::NetworkSnapshot;
use cdst_core::ids::ExternalId;
use cdst_core::{CdstError, CdstResult};
use cdst_routing::Provider;
use cdst_solver::{LabCapacity, Problem, ProblemBuilder, RoutingSource};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Half-open `[start, end)` window demand observations are aggregated over.
/// Observations outside the window are dropped, not clamped to its edges.
#[derive(Debug, Clone, Copy)]
pub struct DemandWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn validate_ids(snapshot: &NetworkSnapshot) -> CdstResult<()> {
    let mut seen = HashSet::new();
    for area in &snapshot.areas {
        if area.id.trim().is_empty() {
            return Err(CdstError::Validation("area id cannot be empty".into()));
        }
        if !seen.insert(format!("area:{}", area.id)) {
            return Err(CdstError::Validation(format!("duplicate area id '{}'", area.id)));
        }
    }
    for lab in &snapshot.labs {
        if lab.id.trim().is_empty() {
            return Err(CdstError::Validation("lab id cannot be empty".into()));
        }
        if !seen.insert(format!("lab:{}", lab.id)) {
            return Err(CdstError::Validation(format!("duplicate lab id '{}'", lab.id)));
        }
    }
    for test in &snapshot.tests {
        if test.id.trim().is_empty() {
            return Err(CdstError::Validation("test id cannot be empty".into()));
        }
        if !seen.insert(format!("test:{}", test.id)) {
            return Err(CdstError::Validation(format!("duplicate test id '{}'", test.id)));
        }
    }
    if snapshot.areas.is_empty() {
        return Err(CdstError::Validation("network snapshot has no areas".into()));
    }
    if snapshot.labs.is_empty() {
        return Err(CdstError::Validation("network snapshot has no labs".into()));
    }
    if snapshot.tests.is_empty() {
        return Err(CdstError::Validation("network snapshot has no test types".into()));
    }
    Ok(())
}

fn validate_coordinates(lat: f64, lng: f64, label: &str) -> CdstResult<()> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(CdstError::Validation(format!("{label} latitude {lat} outside [-90, 90]")));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(CdstError::Validation(format!("{label} longitude {lng} outside [-180, 180]")));
    }
    Ok(())
}

/// Field-level sanity checks beyond ID uniqueness: coordinates within
/// range, capacities positive, a capability's staffing demand within what
/// the lab actually has, and processing time within a plausible window.
fn validate_fields(snapshot: &NetworkSnapshot) -> CdstResult<()> {
    for area in &snapshot.areas {
        validate_coordinates(area.lat, area.lng, &format!("area '{}'", area.id))?;
    }

    let lab_by_id: HashMap<&str, &crate::snapshot::LabRecord> =
        snapshot.labs.iter().map(|l| (l.id.as_str(), l)).collect();

    for lab in &snapshot.labs {
        validate_coordinates(lab.lat, lab.lng, &format!("lab '{}'", lab.id))?;
        if lab.staff_count == 0 {
            return Err(CdstError::Validation(format!("lab '{}' must have a positive staff_count", lab.id)));
        }
        if lab.max_per_day == 0 || lab.max_per_month == 0 {
            return Err(CdstError::Validation(format!("lab '{}' capacities must be positive", lab.id)));
        }
        if lab.weekday_hours_minutes.iter().all(|m| *m <= 0.0) {
            return Err(CdstError::Validation(format!("lab '{}' is never open", lab.id)));
        }
        if lab.weekday_hours_minutes.iter().any(|m| *m < 0.0) {
            return Err(CdstError::Validation(format!("lab '{}' has a negative open-minutes entry", lab.id)));
        }
    }

    for cap in &snapshot.capabilities {
        if !(5.0..=480.0).contains(&cap.proc_time_minutes) {
            return Err(CdstError::Validation(format!(
                "capability '{}'/'{}' proc_time_minutes {} outside [5, 480]",
                cap.lab_id, cap.test_id, cap.proc_time_minutes
            )));
        }
        if let Some(lab) = lab_by_id.get(cap.lab_id.as_str()) {
            if cap.staff_required > lab.staff_count as f64 {
                return Err(CdstError::Validation(format!(
                    "capability '{}'/'{}' requires {} staff but lab only has {}",
                    cap.lab_id, cap.test_id, cap.staff_required, lab.staff_count
                )));
            }
        }
        if cap.staff_required <= 0.0 {
            return Err(CdstError::Validation(format!(
                "capability '{}'/'{}' staff_required must be positive",
                cap.lab_id, cap.test_id
            )));
        }
    }

    Ok(())
}

/// Validate `snapshot`, aggregate demand over `window`, resolve
/// distances through `provider`, and build the dense [`Problem`].
pub fn build_problem(
    snapshot: &NetworkSnapshot,
    window: DemandWindow,
    provider: &Provider,
) -> CdstResult<Problem> {
    validate_ids(snapshot)?;
    validate_fields(snapshot)?;

    let area_index: HashMap<&str, usize> = snapshot
        .areas
        .iter()
        .enumerate()
        .map(|(i, a)| (a.id.as_str(), i))
        .collect();
    let lab_index: HashMap<&str, usize> = snapshot
        .labs
        .iter()
        .enumerate()
        .map(|(i, l)| (l.id.as_str(), i))
        .collect();
    let test_index: HashMap<&str, usize> = snapshot
        .tests
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();

    for cap in &snapshot.capabilities {
        if !lab_index.contains_key(cap.lab_id.as_str()) {
            return Err(CdstError::Validation(format!(
                "capability references unknown lab '{}'",
                cap.lab_id
            )));
        }
        if !test_index.contains_key(cap.test_id.as_str()) {
            return Err(CdstError::Validation(format!(
                "capability references unknown test '{}'",
                cap.test_id
            )));
        }
    }
    for demand in &snapshot.demand {
        if !area_index.contains_key(demand.area_id.as_str()) {
            return Err(CdstError::Validation(format!(
                "demand record references unknown area '{}'",
                demand.area_id
            )));
        }
        if !test_index.contains_key(demand.test_id.as_str()) {
            return Err(CdstError::Validation(format!(
                "demand record references unknown test '{}'",
                demand.test_id
            )));
        }
    }

    let n_areas = snapshot.areas.len();
    let n_labs = snapshot.labs.len();
    let n_tests = snapshot.tests.len();

    let mut builder = ProblemBuilder::new(n_areas, n_labs, n_tests)
        .cost_per_km(snapshot.cost_per_km)
        .max_acceptable_distance_km(snapshot.max_acceptable_distance_km);

    for (i, area) in snapshot.areas.iter().enumerate() {
        builder = builder
            .area_id(cdst_core::ids::AreaIndex::new(i), ExternalId::new(area.id.clone()))
            .pop(cdst_core::ids::AreaIndex::new(i), area.population.max(0.0));
    }

    let mut routed_any = false;
    let mut fallback_any = false;
    for (i, lab) in snapshot.labs.iter().enumerate() {
        let j = cdst_core::ids::LabIndex::new(i);
        builder = builder
            .lab_id(j, ExternalId::new(lab.id.clone()))
            .capacity(
                j,
                LabCapacity {
                    max_per_day: lab.max_per_day,
                    max_per_month: lab.max_per_month,
                    staff_count: lab.staff_count,
                    util_factor: lab.util_factor,
                },
            )
            .hours(j, lab.weekday_hours_minutes)
            .overhead(j, lab.monthly_overhead);

        for (a, area) in snapshot.areas.iter().enumerate() {
            let origin = cdst_core::solver::LatLng::new(area.lat, area.lng);
            let dest = cdst_core::solver::LatLng::new(lab.lat, lab.lng);
            let routed = provider.distance(origin, dest);
            match routed.estimate.source {
                cdst_core::solver::EstimateSource::Routed => routed_any = true,
                cdst_core::solver::EstimateSource::Fallback => fallback_any = true,
            }
            builder = builder.distance(
                cdst_core::ids::AreaIndex::new(a),
                j,
                routed.estimate.km,
                routed.estimate.minutes,
            );
        }
    }

    for (i, test) in snapshot.tests.iter().enumerate() {
        builder = builder.test_id(cdst_core::ids::TestIndex::new(i), ExternalId::new(test.id.clone()));
    }

    for cap in &snapshot.capabilities {
        let j = cdst_core::ids::LabIndex::new(lab_index[cap.lab_id.as_str()]);
        let t = cdst_core::ids::TestIndex::new(test_index[cap.test_id.as_str()]);
        builder = builder.capability(
            j,
            t,
            cap.proc_time_minutes,
            cap.staff_required,
            cap.equipment_utilization,
            cap.cost_per_test,
            cap.quality_score,
        );
    }

    let mut aggregated: HashMap<(usize, usize), u32> = HashMap::new();
    for demand in &snapshot.demand {
        if demand.observed_at < window.start || demand.observed_at >= window.end {
            continue;
        }
        let a = area_index[demand.area_id.as_str()];
        let t = test_index[demand.test_id.as_str()];
        *aggregated.entry((a, t)).or_insert(0) += demand.count;
    }
    for ((a, t), count) in aggregated {
        builder = builder.demand(
            cdst_core::ids::AreaIndex::new(a),
            cdst_core::ids::TestIndex::new(t),
            count,
        );
    }

    let routing_source = if routed_any && fallback_any {
        RoutingSource::Mixed
    } else if routed_any {
        RoutingSource::Routed
    } else {
        RoutingSource::Fallback
    };
    builder = builder.routing_source(routing_source);

    let problem = builder.build();
    ensure_every_test_is_coverable(&problem)?;
    ensure_capacity_covers_demand(&problem)?;
    Ok(problem)
}

/// Reject snapshots where some test type has no capable lab anywhere,
/// since no allocation could ever satisfy its demand.
fn ensure_every_test_is_coverable(problem: &Problem) -> CdstResult<()> {
    for t in problem.test_indices() {
        let covered = problem.lab_indices().any(|j| problem.capable(j, t));
        if !covered {
            return Err(CdstError::Validation(format!(
                "test '{}' has no capable lab in the network snapshot",
                problem.test_ids[t.index()]
            )));
        }
    }
    Ok(())
}

/// Reject snapshots where a test type has capable labs but their combined
/// capacity can't cover total demand — a network that's nominally
/// coverable but would always leave a fixed shortfall no repair pass can
/// close.
fn ensure_capacity_covers_demand(problem: &Problem) -> CdstResult<()> {
    for t in problem.test_indices() {
        let total_capacity: u64 = problem
            .lab_indices()
            .filter(|&j| problem.capable(j, t))
            .map(|j| {
                let proc_time = problem.proc_time_min(j, t);
                (problem.available_minutes(j) / proc_time).floor() as u64
            })
            .sum();
        let total_demand: u64 = problem.area_indices().map(|a| problem.demand(a, t) as u64).sum();
        if total_demand > total_capacity {
            return Err(CdstError::Validation(format!(
                "test '{}' demand {} exceeds total capable capacity {}",
                problem.test_ids[t.index()], total_demand, total_capacity
            )));
        }
    }
    Ok(())
}
