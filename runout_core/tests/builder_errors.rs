use runout_core::error::BuildError;
use runout_core::mocks::RecordingQueue;
use runout_core::{DispatchConfig, FilamentRunout, MonitorConfig, StrategyKind};
use rstest::rstest;

#[rstest]
fn builder_missing_config_yields_typed_build_error() {
    let err = FilamentRunout::builder()
        // missing with_config()
        .with_command_queue(RecordingQueue::default())
        .try_build()
        .expect_err("should fail with MissingConfig");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingConfig) => {}
        other => panic!("expected MissingConfig, got: {other:?}"),
    }
}

fn with_extruders(n: usize) -> MonitorConfig {
    MonitorConfig {
        extruder_count: n,
        ..MonitorConfig::default()
    }
}

fn with_threshold(t: u8) -> MonitorConfig {
    let mut c = MonitorConfig::default();
    c.debounce.threshold = t;
    c
}

fn with_distance(mm: f32) -> MonitorConfig {
    let mut c = MonitorConfig {
        strategy: StrategyKind::DistanceCountdown,
        ..MonitorConfig::default()
    };
    c.distance.runout_distance_mm = mm;
    c
}

fn with_window(min_pulses: u32, window_ticks: u32) -> MonitorConfig {
    let mut c = MonitorConfig::default();
    c.encoder.min_pulses = min_pulses;
    c.encoder.window_ticks = window_ticks;
    c
}

#[rstest]
#[case(with_extruders(0), "extruder_count")]
#[case(with_extruders(9), "MAX_SENSORS")]
#[case(with_threshold(0), "threshold")]
#[case(with_distance(0.0), "runout_distance_mm")]
#[case(with_distance(-5.0), "runout_distance_mm")]
#[case(with_distance(f32::NAN), "runout_distance_mm")]
#[case(with_window(0, 1), "encoder")]
#[case(with_window(1, 0), "encoder")]
fn invalid_monitor_config_is_rejected(#[case] cfg: MonitorConfig, #[case] needle: &str) {
    let err = FilamentRunout::builder()
        .with_config(cfg)
        .build()
        .expect_err("invalid config must be rejected");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => assert!(msg.contains(needle), "{msg}"),
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
#[case("   ")]
#[case("M600\nG28")]
fn invalid_runout_script_is_rejected(#[case] script: &str) {
    let err = FilamentRunout::builder()
        .with_config(MonitorConfig::default())
        .with_dispatch(DispatchConfig {
            runout_script: Some(script.to_string()),
            ..DispatchConfig::default()
        })
        .build()
        .expect_err("bad script");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[test]
fn minimal_build_succeeds_without_collaborators() {
    let runout = FilamentRunout::builder()
        .with_config(MonitorConfig::default())
        .build()
        .expect("defaults are valid");
    assert!(runout.monitor().is_enabled());
    assert_eq!(runout.monitor().extruder_count(), 1);
}
