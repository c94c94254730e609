//! `self-check`: validate, probe and print the effective settings.

use runout_config::Config;
use runout_core::hw_error::map_hw_error;
use runout_core::util::{debounce_latency_ms, poll_rate_hz};
use runout_core::{DispatchConfig, MonitorConfig, StrategyKind, WatchMode};
use runout_traits::FilamentInput;
use serde_json::json;

use crate::collaborators::{Transcript, console_runout};
use crate::watch::open_input;

const BACKEND: &str = if cfg!(all(feature = "hardware", target_os = "linux")) {
    "gpio"
} else {
    "simulated"
};

fn strategy_name(k: StrategyKind) -> &'static str {
    match k {
        StrategyKind::Debounced => "debounced",
        StrategyKind::DistanceCountdown => "distance",
    }
}

fn watch_name(w: WatchMode) -> &'static str {
    match w {
        WatchMode::All => "all",
        WatchMode::Active => "active",
    }
}

pub fn run_self_check(cfg: &Config, json: bool) -> eyre::Result<()> {
    let monitor = MonitorConfig::from(cfg);
    let dispatch = DispatchConfig::from(&cfg.dispatch);
    let period_ms = cfg.polling.period_ms;

    // Assemble once so builder-level validation runs too.
    let _ = console_runout(monitor.clone(), dispatch.clone(), &Transcript::default(), false)?;

    let mut input = open_input(cfg, None)?;
    let mut faults = Vec::new();
    for e in 0..monitor.extruder_count {
        if let Err(err) = input.read(e) {
            let mapped = map_hw_error(&*err);
            tracing::warn!(extruder = e, error = %mapped, "sensor probe failed");
            faults.push(format!("T{e}: {mapped}"));
        }
    }

    let latency_ms = debounce_latency_ms(monitor.debounce.threshold, period_ms);
    let script = dispatch.runout_script.as_deref().unwrap_or("");
    if json {
        println!(
            "{}",
            json!({
                "ok": faults.is_empty(),
                "backend": BACKEND,
                "extruders": monitor.extruder_count,
                "enabled": monitor.enabled,
                "strategy": strategy_name(monitor.strategy),
                "debounce_threshold": monitor.debounce.threshold,
                "debounce_latency_ms": latency_ms,
                "runout_distance_mm": monitor.distance.runout_distance_mm,
                "watch": watch_name(monitor.watch),
                "multi_sensor": monitor.multi_sensor,
                "poll_rate_hz": poll_rate_hz(period_ms),
                "runout_script": script,
                "host_action_commands": dispatch.host_action_commands,
                "automatic_migration": dispatch.automatic_migration,
                "faults": faults,
            })
        );
    } else {
        println!(
            "backend: {BACKEND}, {} extruder(s), watch {}, multi_sensor {}",
            monitor.extruder_count,
            watch_name(monitor.watch),
            monitor.multi_sensor
        );
        match monitor.strategy {
            StrategyKind::Debounced => println!(
                "strategy: debounced, {} ticks (~{latency_ms} ms at {} Hz)",
                monitor.debounce.threshold,
                poll_rate_hz(period_ms)
            ),
            StrategyKind::DistanceCountdown => println!(
                "strategy: distance, {} mm without motion",
                monitor.distance.runout_distance_mm
            ),
        }
        println!(
            "dispatch: script {script:?}, host actions {}, auto migration {}",
            dispatch.host_action_commands, dispatch.automatic_migration
        );
        if !monitor.enabled {
            println!("monitor disabled in config");
        }
        for f in &faults {
            println!("fault: {f}");
        }
    }

    if !faults.is_empty() {
        eyre::bail!("{} sensor(s) did not respond", faults.len());
    }
    if !json {
        println!("self-check OK");
    }
    Ok(())
}
