//! `watch`: poll the filament inputs at the configured period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use runout_config::Config;
use runout_core::util::poll_rate_hz;
use runout_core::{DispatchConfig, MonitorConfig, SensorSampler};
use runout_traits::{Clock, FilamentInput};

use crate::collaborators::{Transcript, console_runout};
use crate::output::{Summary, event_line};

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
const SIM_PULSES_PER_READ: u32 = 2;

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open_input(
    cfg: &Config,
    runout_after: Option<u64>,
) -> eyre::Result<runout_hardware::SimulatedInput> {
    use runout_config::{RunoutLevel, SensorKind};
    use runout_hardware::SimSensor;

    let sensors = (0..cfg.monitor.extruder_count)
        .map(|i| {
            let s = cfg.sensor(i);
            let sim = match s.kind {
                SensorKind::Switch => SimSensor::switch(s.runout_state == RunoutLevel::High),
                SensorKind::Encoder => SimSensor::encoder(SIM_PULSES_PER_READ),
            };
            match runout_after {
                Some(n) => sim.runout_after(n),
                None => sim,
            }
        })
        .collect();
    Ok(runout_hardware::SimulatedInput::new(sensors))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open_input(
    cfg: &Config,
    runout_after: Option<u64>,
) -> eyre::Result<runout_hardware::gpio::GpioInput> {
    use eyre::WrapErr;
    use runout_config::SensorKind;
    use runout_hardware::gpio::GpioSensor;

    if runout_after.is_some() {
        tracing::warn!("--runout-after only applies to simulated inputs; ignoring");
    }
    let mut sensors = Vec::with_capacity(cfg.monitor.extruder_count);
    for i in 0..cfg.monitor.extruder_count {
        let s = cfg.sensor(i);
        let Some(pin) = s.pin else {
            eyre::bail!("sensors[{i}].pin is missing; hardware builds need a pin per extruder");
        };
        sensors.push(match s.kind {
            SensorKind::Switch => GpioSensor::Switch { pin },
            SensorKind::Encoder => GpioSensor::Encoder { pin },
        });
    }
    runout_hardware::gpio::GpioInput::new(&sensors).wrap_err("open filament inputs")
}

pub fn run_watch(
    cfg: &Config,
    ticks: Option<u64>,
    runout_after: Option<u64>,
    mm_per_tick: f32,
    json: bool,
    shutdown: &AtomicBool,
    clock: &impl Clock,
) -> eyre::Result<Summary> {
    if !mm_per_tick.is_finite() {
        eyre::bail!("--mm-per-tick must be a finite number");
    }
    let monitor = MonitorConfig::from(cfg);
    let dispatch = DispatchConfig::from(&cfg.dispatch);
    let extruders = monitor.extruder_count;

    let mut sampler = SensorSampler::new(open_input(cfg, runout_after)?, &monitor);
    let transcript = Transcript::default();
    let mut runout = console_runout(monitor, dispatch, &transcript, false)?;

    let period_ms = cfg.polling.period_ms;
    let period = Duration::from_millis(period_ms);
    tracing::info!(
        period_ms,
        rate_hz = poll_rate_hz(period_ms),
        extruders,
        "watching filament sensors"
    );

    let mut summary = Summary::default();
    let mut next = clock.now();
    while !shutdown.load(Ordering::Relaxed) && ticks.is_none_or(|n| summary.ticks < n) {
        for e in 0..extruders {
            let sample = sampler.sample(e);
            if let Some(record) = runout.on_tick(e, sample, mm_per_tick)? {
                summary.record(&record);
                println!(
                    "{}",
                    event_line(json, summary.ticks, &record, &transcript.drain())
                );
            }
        }
        summary.ticks += 1;

        next += period;
        let now = clock.now();
        if next > now {
            clock.sleep(next - now);
        } else {
            // Overran the period; do not try to catch up with a burst.
            next = now;
        }
    }

    report_stale(&sampler, extruders);
    println!("{}", summary.line(json));
    Ok(summary)
}

fn report_stale<I: FilamentInput>(sampler: &SensorSampler<I>, extruders: usize) {
    for e in 0..extruders {
        let stale = sampler.stale_reads(e);
        if stale > 0 {
            tracing::warn!(extruder = e, stale, "sensor ended the run unreadable");
        }
    }
}
