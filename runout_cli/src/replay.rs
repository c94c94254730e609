//! `replay`: drive the monitor from a recorded trace.

use std::path::Path;

use eyre::WrapErr;
use runout_config::{Config, TraceRow};
use runout_core::{DispatchConfig, MonitorConfig, RunoutState, SensorSample};

use crate::collaborators::{Transcript, console_runout};
use crate::output::{Summary, event_line};

fn row_sample(row: &TraceRow) -> SensorSample {
    match (row.present, row.pulses) {
        (_, Some(count)) => SensorSample::Pulses { count },
        (present, None) => SensorSample::Presence {
            present: present.unwrap_or(true),
        },
    }
}

pub fn run_replay(
    cfg: &Config,
    trace: &Path,
    pause_in_progress: bool,
    json: bool,
) -> eyre::Result<Summary> {
    let rows = runout_config::load_trace_csv(trace)?;
    let monitor = MonitorConfig::from(cfg);
    let dispatch = DispatchConfig::from(&cfg.dispatch);
    let extruders = monitor.extruder_count;

    let transcript = Transcript::default();
    let mut runout = console_runout(monitor, dispatch, &transcript, pause_in_progress)?;
    tracing::info!(rows = rows.len(), trace = %trace.display(), "replaying trace");

    let mut summary = Summary::default();
    let mut last_tick = None;
    for row in &rows {
        if last_tick != Some(row.tick) {
            summary.ticks += 1;
            last_tick = Some(row.tick);
        }
        let record = runout
            .on_tick(row.extruder, row_sample(row), row.distance_mm)
            .wrap_err_with(|| format!("trace tick {}", row.tick))?;
        if let Some(record) = record {
            summary.record(&record);
            println!("{}", event_line(json, row.tick, &record, &transcript.drain()));
        }
    }

    for e in 0..extruders {
        if runout.state(e) == RunoutState::RanOut {
            tracing::info!(extruder = e, "extruder still latched at end of trace");
        }
    }
    println!("{}", summary.line(json));
    Ok(summary)
}
