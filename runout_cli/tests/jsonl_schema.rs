use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_two_extruder_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[monitor]
strategy = "distance"
extruder_count = 2
multi_sensor = true

[distance]
runout_distance_mm = 20.0

[[sensors]]
kind = "encoder"

[[sensors]]
kind = "encoder"
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

// Extruder 0 keeps moving; extruder 1 feeds 5 mm per tick with a frozen encoder.
fn write_distance_trace(dir: &tempfile::TempDir) -> PathBuf {
    let mut csv = String::from("tick,extruder,present,pulses,distance_mm\n");
    for tick in 0..6u32 {
        csv.push_str(&format!("{tick},0,,{},5.0\n", tick * 4));
        csv.push_str(&format!("{tick},1,,100,5.0\n"));
    }
    let path = dir.path().join("trace.csv");
    fs::write(&path, csv).unwrap();
    path
}

fn json_lines(bytes: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("stdout line is JSON"))
        .collect()
}

/// Validate the JSONL schema of a replay: event lines then one summary line.
#[rstest]
fn jsonl_replay_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_two_extruder_config(&dir);
    let trace = write_distance_trace(&dir);

    let mut cmd = Command::cargo_bin("runout").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--trace")
        .arg(&trace);

    let out = cmd.assert().success().get_output().stdout.clone();
    let lines = json_lines(&out);
    assert_eq!(lines.len(), 2, "expected one event and a summary: {lines:?}");

    let ev = &lines[0];
    assert_eq!(ev["event"], "runout");
    assert_eq!(ev["extruder"], 1);
    assert_eq!(ev["outcome"], "script_injected");
    assert_eq!(ev["delivered"], true);
    assert!(ev.get("tick").and_then(|x| x.as_u64()).is_some());
    assert_eq!(ev["emitted"], serde_json::json!(["M600 T1"]));

    let summary = &lines[1];
    assert_eq!(summary["event"], "summary");
    assert_eq!(summary["ticks"], 6);
    assert_eq!(summary["events"], 1);
    assert_eq!(summary["delivered"], 1);
    assert_eq!(summary["suppressed"], 0);
}

/// Errors are a single JSON object on stderr with --json.
#[rstest]
fn jsonl_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_two_extruder_config(&dir);
    let trace = dir.path().join("trace.csv");
    fs::write(&trace, "tick,extruder,present,pulses,distance_mm\n0,5,true,,0.0\n").unwrap();

    let mut cmd = Command::cargo_bin("runout").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("off")
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--trace")
        .arg(&trace);

    let out = cmd.assert().code(4).get_output().stderr.clone();
    let stderr = String::from_utf8_lossy(&out);
    let last = stderr.lines().last().unwrap_or("");
    let v: serde_json::Value = serde_json::from_str(last).expect("valid JSON");
    assert_eq!(v["reason"], "ExtruderOutOfRange");
    assert_eq!(v["details"]["extruder"], 5);
    assert_eq!(v["details"]["extruder_count"], 2);
    assert!(v.get("message").and_then(|x| x.as_str()).is_some());
}

#[rstest]
fn jsonl_self_check_reports_settings() {
    let dir = tempdir().unwrap();
    let cfg = write_two_extruder_config(&dir);

    let mut cmd = Command::cargo_bin("runout").unwrap();
    cmd.arg("--json").arg("--config").arg(&cfg).arg("self-check");

    let out = cmd.assert().success().get_output().stdout.clone();
    let lines = json_lines(&out);
    assert_eq!(lines.len(), 1);
    let v = &lines[0];
    assert_eq!(v["ok"], true);
    assert_eq!(v["strategy"], "distance");
    assert_eq!(v["extruders"], 2);
    assert_eq!(v["multi_sensor"], true);
    assert_eq!(v["backend"], "simulated");
}
