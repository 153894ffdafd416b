use assert_cmd::Command;
use chrono::Utc;
use predicates::prelude::*;
use serde_json::json;
use std::path::Path;

fn write_fixture_snapshot(path: &Path) {
    let observed_at = Utc::now().to_rfc3339();
    let snapshot = json!({
        "areas": [{"id": "area-1", "lat": 40.0, "lng": -75.0, "population": 1000.0}],
        "labs": [{
            "id": "lab-1",
            "lat": 40.1,
            "lng": -75.1,
            "max_per_day": 200,
            "max_per_month": 5000,
            "staff_count": 4,
            "util_factor": 0.9,
            "monthly_overhead": 1000.0,
            "weekday_hours_minutes": [480.0, 480.0, 480.0, 480.0, 480.0, 0.0, 0.0]
        }],
        "tests": [{"id": "test-1"}],
        "capabilities": [{
            "lab_id": "lab-1",
            "test_id": "test-1",
            "proc_time_minutes": 15.0,
            "staff_required": 1.0,
            "equipment_utilization": 0.5,
            "cost_per_test": 8.0,
            "quality_score": 0.95
        }],
        "demand": [{"area_id": "area-1", "test_id": "test-1", "observed_at": observed_at, "count": 40}],
        "cost_per_km": 0.5,
        "max_acceptable_distance_km": 50.0
    });
    std::fs::write(path, serde_json::to_vec_pretty(&snapshot).unwrap()).unwrap();
}

#[test]
fn config_path_prints_a_path_under_dot_cdst() {
    let mut cmd = Command::cargo_bin("cdst").unwrap();
    cmd.arg("config").arg("path");
    cmd.assert().success().stdout(predicate::str::contains(".cdst"));
}

#[test]
fn run_against_a_small_snapshot_completes() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("snapshot.json");
    write_fixture_snapshot(&snapshot_path);
    let out_path = dir.path().join("result.json");

    let mut cmd = Command::cargo_bin("cdst").unwrap();
    cmd.env("HOME", dir.path());
    cmd.arg("run")
        .arg(&snapshot_path)
        .arg("--scenario-id")
        .arg("smoke")
        .arg("--population-size")
        .arg("6")
        .arg("--max-generations")
        .arg("3")
        .arg("--out")
        .arg(&out_path);

    cmd.assert().success();
    let written = std::fs::read_to_string(&out_path).unwrap();
    assert!(written.contains("\"status\": \"completed\""));
}
