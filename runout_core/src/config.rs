//! Runtime configuration for the runout monitor and dispatcher.
//!
//! These are separate from the TOML-deserialized config in `runout_config`;
//! `conversions` bridges the two. Everything here is fixed for the life of a
//! monitor.

use runout_traits::MAX_SENSORS;

use crate::error::BuildError;

/// Response algorithm, chosen once per machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    #[default]
    Debounced,
    DistanceCountdown,
}

/// Which extruders may raise a runout event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchMode {
    #[default]
    All,
    /// Only the extruder published as active on the `MonitorHandle`.
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorKind {
    #[default]
    Switch,
    Encoder,
}

/// How one extruder's sensor is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorMapping {
    pub kind: SensorKind,
    /// Pin level meaning "no filament" (`false` = low).
    pub runout_level: bool,
}

/// Debounced presence parameters.
#[derive(Debug, Clone, Copy)]
pub struct DebounceCfg {
    /// Consecutive absent ticks before the verdict is out. Also the counter ceiling.
    pub threshold: u8,
}

impl Default for DebounceCfg {
    fn default() -> Self {
        Self { threshold: 5 }
    }
}

/// Distance countdown parameters.
#[derive(Debug, Clone, Copy)]
pub struct DistanceCfg {
    /// Budget refilled on every motion confirmation (mm).
    pub runout_distance_mm: f32,
}

impl Default for DistanceCfg {
    fn default() -> Self {
        Self {
            runout_distance_mm: 25.0,
        }
    }
}

/// Encoder motion confirmation: `min_pulses` edges within `window_ticks` ticks.
#[derive(Debug, Clone, Copy)]
pub struct EncoderCfg {
    pub min_pulses: u32,
    pub window_ticks: u32,
}

impl Default for EncoderCfg {
    fn default() -> Self {
        Self {
            min_pulses: 1,
            window_ticks: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Initial value of the enabled flag; toggled at run time via `MonitorHandle`.
    pub enabled: bool,
    pub strategy: StrategyKind,
    pub extruder_count: usize,
    pub multi_sensor: bool,
    pub watch: WatchMode,
    pub debounce: DebounceCfg,
    pub distance: DistanceCfg,
    pub encoder: EncoderCfg,
    pub sensors: [SensorMapping; MAX_SENSORS],
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: StrategyKind::Debounced,
            extruder_count: 1,
            multi_sensor: false,
            watch: WatchMode::All,
            debounce: DebounceCfg::default(),
            distance: DistanceCfg::default(),
            encoder: EncoderCfg::default(),
            sensors: [SensorMapping::default(); MAX_SENSORS],
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.extruder_count == 0 {
            return Err(BuildError::InvalidConfig("extruder_count must be >= 1"));
        }
        if self.extruder_count > MAX_SENSORS {
            return Err(BuildError::InvalidConfig("extruder_count exceeds MAX_SENSORS"));
        }
        if self.debounce.threshold == 0 {
            return Err(BuildError::InvalidConfig("debounce threshold must be >= 1"));
        }
        let d = self.distance.runout_distance_mm;
        if !d.is_finite() || d <= 0.0 {
            return Err(BuildError::InvalidConfig(
                "runout_distance_mm must be finite and > 0",
            ));
        }
        if self.encoder.min_pulses == 0 || self.encoder.window_ticks == 0 {
            return Err(BuildError::InvalidConfig(
                "encoder min_pulses and window_ticks must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Recovery options for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub host_action_commands: bool,
    pub automatic_migration: bool,
    /// Injected on runout when a command queue is present; `None` requests
    /// the pause from the pause pipeline directly.
    pub runout_script: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            host_action_commands: false,
            automatic_migration: false,
            runout_script: Some("M600".to_string()),
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), BuildError> {
        if let Some(script) = &self.runout_script {
            if script.trim().is_empty() {
                return Err(BuildError::InvalidConfig("runout_script must not be blank"));
            }
            if script.contains(['\n', '\r']) {
                return Err(BuildError::InvalidConfig("runout_script must be a single line"));
            }
        }
        Ok(())
    }
}
