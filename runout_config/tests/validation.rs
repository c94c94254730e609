use rstest::rstest;
use runout_config::{RunoutLevel, SensorKind, StrategyKind, WatchMode, load_toml};

const FULL: &str = r#"
[monitor]
enabled = true
strategy = "distance"
extruder_count = 2
multi_sensor = true
watch = "active"

[debounce]
threshold = 4

[distance]
runout_distance_mm = 20.0

[encoder]
min_pulses = 2
window_ticks = 3

[dispatch]
host_action_commands = true
automatic_migration = false
runout_script = "M600"

[polling]
period_ms = 5

[[sensors]]
pin = 17
kind = "encoder"

[[sensors]]
pin = 27
kind = "switch"
runout_state = "high"
"#;

#[test]
fn parses_every_section() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.monitor.strategy, StrategyKind::Distance);
    assert_eq!(cfg.monitor.watch, WatchMode::Active);
    assert!(cfg.monitor.multi_sensor);
    assert_eq!(cfg.encoder.min_pulses, 2);
    assert_eq!(cfg.sensor(0).kind, SensorKind::Encoder);
    assert_eq!(cfg.sensor(1).runout_state, RunoutLevel::High);
    assert_eq!(cfg.sensor(0).runout_state, RunoutLevel::Low);
}

#[rstest]
#[case("[monitor]\nextruder_count = 0\n", "monitor.extruder_count must be >= 1")]
#[case("[monitor]\nextruder_count = 9\n", "monitor.extruder_count must be <= 8")]
#[case("[debounce]\nthreshold = 0\n", "debounce.threshold must be >= 1")]
#[case("[distance]\nrunout_distance_mm = 0.0\n", "distance.runout_distance_mm must be > 0")]
#[case("[distance]\nrunout_distance_mm = -3.0\n", "distance.runout_distance_mm must be > 0")]
#[case("[encoder]\nmin_pulses = 0\n", "encoder.min_pulses must be >= 1")]
#[case("[encoder]\nwindow_ticks = 0\n", "encoder.window_ticks must be >= 1")]
#[case("[polling]\nperiod_ms = 0\n", "polling.period_ms must be in [1, 1000]")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation must be one of")]
#[case("[dispatch]\nrunout_script = \"M600\\nM112\"\n", "single line")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[test]
fn rejects_sensor_count_mismatch() {
    let toml = r#"
[monitor]
extruder_count = 2

[[sensors]]
kind = "switch"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("mismatch");
    assert!(format!("{err}").contains("exactly monitor.extruder_count (2)"));
}

#[test]
fn rejects_shared_pins() {
    let toml = r#"
[monitor]
extruder_count = 2

[[sensors]]
pin = 4

[[sensors]]
pin = 4
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("duplicate pin");
    assert!(format!("{err}").contains("sensors[1].pin 4"));
}

#[test]
fn shipped_sample_config_is_valid() {
    let text = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/../etc/runout.toml"))
        .expect("read etc/runout.toml");
    let cfg = load_toml(&text).expect("parse sample");
    cfg.validate().expect("sample validates");
    assert_eq!(cfg.monitor.strategy, StrategyKind::Debounced);
    assert_eq!(cfg.dispatch.runout_script, "M600");
}
