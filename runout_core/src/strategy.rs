//! Response strategies: turn per-tick samples into a per-extruder verdict.
//!
//! Exactly one strategy is active per monitor, chosen from `MonitorConfig`.
//! All state lives in fixed arrays indexed by extruder; `update` is O(1).

use runout_traits::MAX_SENSORS;

use crate::config::{EncoderCfg, MonitorConfig, StrategyKind};
use crate::sampler::SensorSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Present,
    Out,
}

/// Encoder motion confirmation over a window of ticks.
///
/// Motion is confirmed once `min_pulses` counter edges have been seen since
/// the window opened; the window is judged "no motion" after `window_ticks`
/// ticks without reaching that count. Either outcome reopens the window.
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionWindow {
    last_count: Option<u32>,
    pulses: u32,
    ticks: u32,
}

impl MotionWindow {
    /// Feed the current counter value.
    ///
    /// Returns `Some(true)` on confirmed motion, `Some(false)` when the window
    /// closed without enough pulses, `None` while the window is still open.
    /// The first observation only primes the counter.
    #[inline]
    pub fn observe(&mut self, count: u32, cfg: &EncoderCfg) -> Option<bool> {
        let last = self.last_count.replace(count)?;
        self.pulses = self.pulses.saturating_add(count.wrapping_sub(last));
        self.ticks = self.ticks.saturating_add(1);
        if self.pulses >= cfg.min_pulses {
            self.reopen();
            Some(true)
        } else if self.ticks >= cfg.window_ticks {
            self.reopen();
            Some(false)
        } else {
            None
        }
    }

    fn reopen(&mut self) {
        self.pulses = 0;
        self.ticks = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Counter-based hysteresis on the presence signal.
#[derive(Debug, Clone)]
pub struct Debounced {
    threshold: u8,
    encoder: EncoderCfg,
    counts: [u8; MAX_SENSORS],
    out: [bool; MAX_SENSORS],
    motion: [MotionWindow; MAX_SENSORS],
}

impl Debounced {
    pub fn new(threshold: u8, encoder: EncoderCfg) -> Self {
        Self {
            threshold: threshold.max(1),
            encoder,
            counts: [0; MAX_SENSORS],
            out: [false; MAX_SENSORS],
            motion: [MotionWindow::default(); MAX_SENSORS],
        }
    }

    pub fn update(&mut self, e: usize, sample: SensorSample) -> Verdict {
        let (Some(count), Some(out), Some(motion)) = (
            self.counts.get_mut(e),
            self.out.get_mut(e),
            self.motion.get_mut(e),
        ) else {
            return Verdict::Present;
        };
        let absent = match sample {
            SensorSample::Presence { present } => Some(!present),
            SensorSample::Pulses { count } => motion.observe(count, &self.encoder).map(|m| !m),
        };
        match absent {
            Some(true) => {
                *count = count.saturating_add(1).min(self.threshold);
                if *count >= self.threshold {
                    *out = true;
                }
            }
            Some(false) => {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    *out = false;
                }
            }
            None => {}
        }
        if *out { Verdict::Out } else { Verdict::Present }
    }

    pub fn count(&self, e: usize) -> u8 {
        self.counts.get(e).copied().unwrap_or(0)
    }

    pub fn reset(&mut self, e: usize) {
        if let Some(c) = self.counts.get_mut(e) {
            *c = 0;
        }
        if let Some(o) = self.out.get_mut(e) {
            *o = false;
        }
        if let Some(m) = self.motion.get_mut(e) {
            m.reset();
        }
    }
}

/// Remaining-distance budget refilled by confirmed motion.
#[derive(Debug, Clone)]
pub struct DistanceCountdown {
    budget_mm: f32,
    encoder: EncoderCfg,
    remaining: [f32; MAX_SENSORS],
    motion: [MotionWindow; MAX_SENSORS],
}

impl DistanceCountdown {
    pub fn new(budget_mm: f32, encoder: EncoderCfg) -> Self {
        Self {
            budget_mm,
            encoder,
            remaining: [budget_mm; MAX_SENSORS],
            motion: [MotionWindow::default(); MAX_SENSORS],
        }
    }

    pub fn update(&mut self, e: usize, sample: SensorSample, distance_mm: f32) -> Verdict {
        let (Some(remaining), Some(motion)) = (self.remaining.get_mut(e), self.motion.get_mut(e))
        else {
            return Verdict::Present;
        };
        let refill = match sample {
            SensorSample::Presence { present } => present,
            SensorSample::Pulses { count } => {
                motion.observe(count, &self.encoder) == Some(true)
            }
        };
        if refill {
            *remaining = self.budget_mm;
        } else if distance_mm.is_finite() {
            // Retraction (negative distance) gives budget back, never above the maximum.
            *remaining = (*remaining - distance_mm).min(self.budget_mm);
        }
        if *remaining <= 0.0 {
            Verdict::Out
        } else {
            Verdict::Present
        }
    }

    pub fn remaining_mm(&self, e: usize) -> f32 {
        self.remaining.get(e).copied().unwrap_or(self.budget_mm)
    }

    pub fn reset(&mut self, e: usize) {
        if let Some(r) = self.remaining.get_mut(e) {
            *r = self.budget_mm;
        }
        if let Some(m) = self.motion.get_mut(e) {
            m.reset();
        }
    }
}

/// The active strategy.
#[derive(Debug, Clone)]
pub enum ResponseStrategy {
    Debounced(Debounced),
    DistanceCountdown(DistanceCountdown),
}

impl ResponseStrategy {
    pub fn from_config(cfg: &MonitorConfig) -> Self {
        match cfg.strategy {
            StrategyKind::Debounced => {
                Self::Debounced(Debounced::new(cfg.debounce.threshold, cfg.encoder))
            }
            StrategyKind::DistanceCountdown => Self::DistanceCountdown(DistanceCountdown::new(
                cfg.distance.runout_distance_mm,
                cfg.encoder,
            )),
        }
    }

    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::Debounced(_) => StrategyKind::Debounced,
            Self::DistanceCountdown(_) => StrategyKind::DistanceCountdown,
        }
    }

    /// Advance extruder `e` by one tick. `distance_mm` is ignored by the
    /// debounced strategy.
    #[inline]
    pub fn update(&mut self, e: usize, sample: SensorSample, distance_mm: f32) -> Verdict {
        match self {
            Self::Debounced(d) => d.update(e, sample),
            Self::DistanceCountdown(d) => d.update(e, sample, distance_mm),
        }
    }

    pub fn reset(&mut self, e: usize) {
        match self {
            Self::Debounced(d) => d.reset(e),
            Self::DistanceCountdown(d) => d.reset(e),
        }
    }

    pub fn reset_all(&mut self) {
        for e in 0..MAX_SENSORS {
            self.reset(e);
        }
    }

    /// True while extruder `e` has partial progress toward an Out verdict.
    pub fn is_counting(&self, e: usize) -> bool {
        match self {
            Self::Debounced(d) => d.count(e) > 0,
            Self::DistanceCountdown(d) => d.remaining_mm(e) < d.budget_mm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABSENT: SensorSample = SensorSample::Presence { present: false };
    const PRESENT: SensorSample = SensorSample::Presence { present: true };

    #[test]
    fn debounce_saturates_at_threshold() {
        let mut d = Debounced::new(3, EncoderCfg::default());
        for _ in 0..10 {
            d.update(0, ABSENT);
        }
        assert_eq!(d.count(0), 3);
        // Three present ticks bring it back to zero.
        assert_eq!(d.update(0, PRESENT), Verdict::Out);
        assert_eq!(d.update(0, PRESENT), Verdict::Out);
        assert_eq!(d.update(0, PRESENT), Verdict::Present);
    }

    #[test]
    fn motion_window_primes_then_judges() {
        let cfg = EncoderCfg {
            min_pulses: 2,
            window_ticks: 3,
        };
        let mut w = MotionWindow::default();
        assert_eq!(w.observe(100, &cfg), None);
        assert_eq!(w.observe(101, &cfg), None);
        assert_eq!(w.observe(102, &cfg), Some(true));
        assert_eq!(w.observe(102, &cfg), None);
        assert_eq!(w.observe(102, &cfg), None);
        assert_eq!(w.observe(102, &cfg), Some(false));
    }

    #[test]
    fn motion_window_handles_counter_wrap() {
        let cfg = EncoderCfg::default();
        let mut w = MotionWindow::default();
        w.observe(u32::MAX, &cfg);
        assert_eq!(w.observe(1, &cfg), Some(true));
    }

    #[test]
    fn retraction_never_exceeds_budget() {
        let mut d = DistanceCountdown::new(10.0, EncoderCfg::default());
        d.update(0, ABSENT, 4.0);
        d.update(0, ABSENT, -20.0);
        assert!((d.remaining_mm(0) - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn non_finite_distance_is_ignored() {
        let mut d = DistanceCountdown::new(10.0, EncoderCfg::default());
        assert_eq!(d.update(0, ABSENT, f32::NAN), Verdict::Present);
        assert_eq!(d.update(0, ABSENT, f32::INFINITY), Verdict::Present);
        assert!((d.remaining_mm(0) - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_extruder_reads_present() {
        let mut s = ResponseStrategy::Debounced(Debounced::new(1, EncoderCfg::default()));
        assert_eq!(s.update(MAX_SENSORS, ABSENT, 0.0), Verdict::Present);
        assert!(!s.is_counting(MAX_SENSORS));
    }
}
