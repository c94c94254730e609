//! Per-tick sensor sampling.
//!
//! `SensorSampler` reads the input inline from the polling context.
//! `BackgroundSampler` owns the input on its own thread and hands the
//! poller the latest snapshot through a bounded channel.
//!
//! Both never fail: a read error yields the last known sample for that
//! sensor. Each `BackgroundSampler` spawns exactly one thread, shut down and
//! joined when the sampler is dropped.
use crossbeam_channel as xch;
use runout_traits::clock::Clock;
use runout_traits::{FilamentInput, MAX_SENSORS, RawSignal};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::{MonitorConfig, SensorKind, SensorMapping};

/// Normalized reading for one extruder on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorSample {
    Presence { present: bool },
    /// Monotonic encoder edge counter; wraps.
    Pulses { count: u32 },
}

impl SensorSample {
    /// Value assumed before the first successful read.
    pub fn initial(mapping: &SensorMapping) -> Self {
        match mapping.kind {
            SensorKind::Switch => Self::Presence { present: true },
            SensorKind::Encoder => Self::Pulses { count: 0 },
        }
    }

    #[inline]
    pub fn from_raw(raw: RawSignal, mapping: &SensorMapping) -> Self {
        match raw {
            RawSignal::Level(level) => Self::Presence {
                present: level != mapping.runout_level,
            },
            RawSignal::Pulses(count) => Self::Pulses { count },
        }
    }
}

/// Anything the monitor can pull one sample per extruder from.
pub trait SampleSource {
    /// Called once at the start of every tick, before any `sample`.
    fn begin_tick(&mut self) {}
    fn sample(&mut self, extruder: usize) -> SensorSample;
}

fn initial_samples(sensors: &[SensorMapping; MAX_SENSORS]) -> [SensorSample; MAX_SENSORS] {
    let mut out = [SensorSample::Presence { present: true }; MAX_SENSORS];
    for (slot, mapping) in out.iter_mut().zip(sensors.iter()) {
        *slot = SensorSample::initial(mapping);
    }
    out
}

/// Inline sampler: one `FilamentInput::read` per `sample` call.
pub struct SensorSampler<I: FilamentInput> {
    input: I,
    sensors: [SensorMapping; MAX_SENSORS],
    last: [SensorSample; MAX_SENSORS],
    // Consecutive failed reads per sensor
    stale: [u32; MAX_SENSORS],
}

impl<I: FilamentInput> SensorSampler<I> {
    pub fn new(input: I, config: &MonitorConfig) -> Self {
        Self {
            input,
            sensors: config.sensors,
            last: initial_samples(&config.sensors),
            stale: [0; MAX_SENSORS],
        }
    }

    /// Read sensor `extruder`, falling back to its last known sample.
    pub fn sample(&mut self, extruder: usize) -> SensorSample {
        let (Some(mapping), Some(last), Some(stale)) = (
            self.sensors.get(extruder),
            self.last.get_mut(extruder),
            self.stale.get_mut(extruder),
        ) else {
            return SensorSample::Presence { present: true };
        };
        match self.input.read(extruder) {
            Ok(raw) => {
                *last = SensorSample::from_raw(raw, mapping);
                *stale = 0;
            }
            Err(e) => {
                *stale = stale.saturating_add(1);
                tracing::trace!(sensor = extruder, stale = *stale, error = %e, "sensor unavailable; reusing last sample");
            }
        }
        *last
    }

    /// Consecutive failed reads for `extruder`.
    pub fn stale_reads(&self, extruder: usize) -> u32 {
        self.stale.get(extruder).copied().unwrap_or(0)
    }
}

impl<I: FilamentInput> SampleSource for SensorSampler<I> {
    fn sample(&mut self, extruder: usize) -> SensorSample {
        SensorSampler::sample(self, extruder)
    }
}

type Snapshot = [Option<RawSignal>; MAX_SENSORS];

/// Threaded sampler for inputs too slow to read inside the polling budget.
pub struct BackgroundSampler {
    rx: xch::Receiver<Snapshot>,
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    sensors: [SensorMapping; MAX_SENSORS],
    last: [SensorSample; MAX_SENSORS],
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    /// Join handle for graceful thread cleanup
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl BackgroundSampler {
    pub fn spawn<I, C>(mut input: I, config: &MonitorConfig, period: Duration, clock: C) -> Self
    where
        I: FilamentInput + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded::<Snapshot>(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let epoch = clock.now();
        let count = config.extruder_count.min(MAX_SENSORS);

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("background sampler received shutdown signal");
                    break;
                }

                let mut snapshot: Snapshot = [None; MAX_SENSORS];
                let mut all_ok = true;
                for (sensor, slot) in snapshot.iter_mut().enumerate().take(count) {
                    match input.read(sensor) {
                        Ok(raw) => *slot = Some(raw),
                        Err(e) => {
                            all_ok = false;
                            let mapped = crate::hw_error::map_hw_error(&*e);
                            tracing::debug!(sensor, error = %mapped, "background read failed");
                        }
                    }
                }
                if all_ok {
                    last_ok_clone.store(clock.ms_since(epoch), Ordering::Relaxed);
                }

                // Bounded wait so shutdown is seen within one period even if
                // the consumer stopped draining.
                match tx.send_timeout(snapshot, period) {
                    Ok(()) | Err(xch::SendTimeoutError::Timeout(_)) => {}
                    Err(xch::SendTimeoutError::Disconnected(_)) => {
                        tracing::debug!("sampler consumer disconnected, exiting thread");
                        break;
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("background sampler thread exiting cleanly");
        });

        Self {
            rx,
            last_ok,
            epoch,
            sensors: config.sensors,
            last: initial_samples(&config.sensors),
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Fold the newest snapshot (if any) into the last known samples. Never blocks.
    pub fn refresh(&mut self) -> bool {
        let Some(snapshot) = self.rx.try_iter().last() else {
            return false;
        };
        for ((slot, mapping), raw) in self
            .last
            .iter_mut()
            .zip(self.sensors.iter())
            .zip(snapshot.iter())
        {
            if let Some(raw) = raw {
                *slot = SensorSample::from_raw(*raw, mapping);
            }
        }
        true
    }

    /// Last known sample for `extruder`.
    pub fn latest(&self, extruder: usize) -> SensorSample {
        self.last
            .get(extruder)
            .copied()
            .unwrap_or(SensorSample::Presence { present: true })
    }

    /// Milliseconds since the last sweep in which every sensor answered.
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    /// `stalled_for` measured against a real monotonic clock.
    pub fn stalled_for_now(&self) -> u64 {
        let ms = Instant::now().saturating_duration_since(self.epoch).as_millis();
        self.stalled_for(u64::try_from(ms).unwrap_or(u64::MAX))
    }
}

impl SampleSource for BackgroundSampler {
    fn begin_tick(&mut self) {
        self.refresh();
    }

    fn sample(&mut self, extruder: usize) -> SensorSample {
        self.latest(extruder)
    }
}

impl Drop for BackgroundSampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits between reads, or after its current send times
        // out (at most one period).
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("background sampler joined");
                }
                Err(e) => {
                    tracing::warn!(?e, "background sampler panicked during shutdown");
                }
            }
        }
    }
}
