//! Per-extruder runout state machine.
//!
//! The monitor applies the active `ResponseStrategy` once per extruder per
//! tick and latches `RanOut` on the first Out verdict. Latched extruders stay
//! `RanOut` until cleared, so a persisting condition fires exactly once.
//!
//! Runtime flags (enabled, printing, active extruder, pending clears) live on
//! a cloneable `MonitorHandle` so other threads can post changes without
//! touching the monitor. They are applied at the start of the next tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicUsize, Ordering};

use runout_traits::MAX_SENSORS;

use crate::config::{MonitorConfig, WatchMode};
use crate::error::{Result, RunoutError};
use crate::sampler::{SampleSource, SensorSample};
use crate::strategy::{ResponseStrategy, Verdict};

/// Externally observable state of one extruder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunoutState {
    Idle,
    /// The strategy has partial progress toward Out.
    Counting,
    /// Latched; waiting for a clear.
    RanOut,
    /// Verdict is Out but firing is gated (not printing, or not watched).
    Suppressed,
}

/// One Idle to RanOut transition. Dispatch it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunoutEdge {
    pub extruder: usize,
}

/// Edges raised in one tick, iterated by ascending extruder index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeSet {
    bits: u8,
}

impl EdgeSet {
    pub(crate) fn insert(&mut self, edge: RunoutEdge) {
        if edge.extruder < MAX_SENSORS {
            self.bits |= 1 << edge.extruder;
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        usize::try_from(self.bits.count_ones()).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = RunoutEdge> {
        let bits = self.bits;
        (0..MAX_SENSORS)
            .filter(move |e| bits & (1 << e) != 0)
            .map(|extruder| RunoutEdge { extruder })
    }
}

#[derive(Debug)]
struct Flags {
    enabled: AtomicBool,
    printing: AtomicBool,
    active_extruder: AtomicUsize,
    pending_clear: AtomicU8,
    /// Bumped on every disable so an off/on pair between ticks still resets.
    disable_epoch: AtomicU32,
}

/// Shared control surface for a `RunoutMonitor`.
///
/// Each flag has one writer: the host (enable), the print job (printing,
/// active extruder) and the pause pipeline (clears).
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    flags: Arc<Flags>,
}

impl MonitorHandle {
    fn new(enabled: bool) -> Self {
        Self {
            flags: Arc::new(Flags {
                enabled: AtomicBool::new(enabled),
                printing: AtomicBool::new(true),
                active_extruder: AtomicUsize::new(0),
                pending_clear: AtomicU8::new(0),
                disable_epoch: AtomicU32::new(0),
            }),
        }
    }

    /// Turning off always discards progress, even if re-enabled before the
    /// monitor ticks again.
    pub fn set_enabled(&self, on: bool) {
        if !on {
            self.flags.disable_epoch.fetch_add(1, Ordering::AcqRel);
        }
        self.flags.enabled.store(on, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.enabled.load(Ordering::Acquire)
    }

    /// While false the strategies are frozen and nothing fires.
    pub fn set_printing(&self, on: bool) {
        self.flags.printing.store(on, Ordering::Release);
    }

    pub fn is_printing(&self) -> bool {
        self.flags.printing.load(Ordering::Acquire)
    }

    /// Extruder watched under `WatchMode::Active`.
    pub fn set_active_extruder(&self, e: usize) {
        self.flags.active_extruder.store(e, Ordering::Release);
    }

    pub fn active_extruder(&self) -> usize {
        self.flags.active_extruder.load(Ordering::Acquire)
    }

    /// Post a clear for extruder `e`; applied on the next tick.
    pub fn request_clear(&self, e: usize) {
        if e < MAX_SENSORS {
            self.flags.pending_clear.fetch_or(1 << e, Ordering::AcqRel);
        }
    }

    /// Post a clear for every extruder, e.g. when a filament change completes.
    pub fn request_clear_all(&self) {
        self.flags.pending_clear.store(u8::MAX, Ordering::Release);
    }

    fn disable_epoch(&self) -> u32 {
        self.flags.disable_epoch.load(Ordering::Acquire)
    }

    fn take_clears(&self) -> u8 {
        self.flags.pending_clear.swap(0, Ordering::AcqRel)
    }
}

pub struct RunoutMonitor {
    config: MonitorConfig,
    strategy: ResponseStrategy,
    ran_out: [bool; MAX_SENSORS],
    verdicts: [Verdict; MAX_SENSORS],
    handle: MonitorHandle,
    was_enabled: bool,
    seen_epoch: u32,
}

impl core::fmt::Debug for RunoutMonitor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunoutMonitor")
            .field("strategy", &self.strategy.kind())
            .field("extruders", &self.config.extruder_count)
            .field("enabled", &self.handle.is_enabled())
            .field("ran_out", &&self.ran_out[..self.extruder_count()])
            .finish()
    }
}

impl RunoutMonitor {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate().map_err(eyre::Report::new)?;
        Ok(Self::from_validated(config))
    }

    pub(crate) fn from_validated(config: MonitorConfig) -> Self {
        let handle = MonitorHandle::new(config.enabled);
        Self {
            seen_epoch: handle.disable_epoch(),
            strategy: ResponseStrategy::from_config(&config),
            ran_out: [false; MAX_SENSORS],
            verdicts: [Verdict::Present; MAX_SENSORS],
            was_enabled: config.enabled,
            handle,
            config,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    pub fn extruder_count(&self) -> usize {
        self.config.extruder_count.min(MAX_SENSORS)
    }

    pub fn strategy(&self) -> &ResponseStrategy {
        &self.strategy
    }

    /// Advance one extruder by one tick.
    ///
    /// Returns the edge to dispatch when this tick latched `RanOut`.
    pub fn on_tick(
        &mut self,
        extruder: usize,
        sample: SensorSample,
        distance_mm: f32,
    ) -> core::result::Result<Option<RunoutEdge>, RunoutError> {
        let count = self.extruder_count();
        if extruder >= count {
            return Err(RunoutError::ExtruderOutOfRange {
                index: extruder,
                count,
            });
        }

        if !self.sync_control() || !self.handle.is_printing() {
            return Ok(None);
        }

        let verdict = self.strategy.update(extruder, sample, distance_mm);
        self.verdicts[extruder] = verdict;

        if verdict == Verdict::Out && !self.ran_out[extruder] && self.is_watched(extruder) {
            self.ran_out[extruder] = true;
            tracing::info!(
                extruder,
                strategy = ?self.strategy.kind(),
                "filament runout detected"
            );
            return Ok(Some(RunoutEdge { extruder }));
        }
        Ok(None)
    }

    /// Sample and advance every configured extruder, lowest index first.
    pub fn poll<S: SampleSource + ?Sized>(&mut self, source: &mut S, distances: &[f32]) -> EdgeSet {
        source.begin_tick();
        let mut edges = EdgeSet::default();
        for e in 0..self.extruder_count() {
            let sample = source.sample(e);
            let d = distances.get(e).copied().unwrap_or(0.0);
            if let Ok(Some(edge)) = self.on_tick(e, sample, d) {
                edges.insert(edge);
            }
        }
        edges
    }

    /// Return extruder `e` to Idle and restart its strategy progress.
    pub fn clear(&mut self, e: usize) {
        if e >= MAX_SENSORS {
            return;
        }
        if self.ran_out[e] {
            tracing::debug!(extruder = e, "runout cleared");
        }
        self.ran_out[e] = false;
        self.verdicts[e] = Verdict::Present;
        self.strategy.reset(e);
    }

    pub fn clear_all(&mut self) {
        for e in 0..MAX_SENSORS {
            self.clear(e);
        }
    }

    /// Enable or disable monitoring. Disabling neutralizes all progress
    /// before this call returns.
    pub fn set_enabled(&mut self, on: bool) {
        self.handle.set_enabled(on);
        self.sync_control();
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_enabled()
    }

    pub fn state(&self, e: usize) -> RunoutState {
        if e >= self.extruder_count() {
            return RunoutState::Idle;
        }
        if self.ran_out[e] {
            RunoutState::RanOut
        } else if !self.handle.is_enabled() {
            RunoutState::Idle
        } else if self.verdicts[e] == Verdict::Out {
            RunoutState::Suppressed
        } else if self.strategy.is_counting(e) {
            RunoutState::Counting
        } else {
            RunoutState::Idle
        }
    }

    /// Apply posted clears and enable changes. Returns the enabled flag.
    fn sync_control(&mut self) -> bool {
        let clears = self.handle.take_clears();
        if clears != 0 {
            for e in 0..MAX_SENSORS {
                if clears & (1 << e) != 0 {
                    self.clear(e);
                }
            }
        }

        let epoch = self.handle.disable_epoch();
        let enabled = self.handle.is_enabled();
        if epoch != self.seen_epoch || (!enabled && self.was_enabled) {
            self.neutralize();
        }
        self.seen_epoch = epoch;
        self.was_enabled = enabled;
        enabled
    }

    fn neutralize(&mut self) {
        self.strategy.reset_all();
        self.ran_out = [false; MAX_SENSORS];
        self.verdicts = [Verdict::Present; MAX_SENSORS];
        tracing::debug!("runout monitoring disabled; progress reset");
    }

    fn is_watched(&self, e: usize) -> bool {
        match self.config.watch {
            WatchMode::All => true,
            WatchMode::Active => self.handle.active_extruder() == e,
        }
    }
}
