//! `From` implementations bridging `runout_config` types to `runout_core` types.

use runout_traits::MAX_SENSORS;

use crate::config::{
    DebounceCfg, DispatchConfig, DistanceCfg, EncoderCfg, MonitorConfig, SensorKind,
    SensorMapping, StrategyKind, WatchMode,
};

impl From<runout_config::StrategyKind> for StrategyKind {
    fn from(k: runout_config::StrategyKind) -> Self {
        match k {
            runout_config::StrategyKind::Debounced => Self::Debounced,
            runout_config::StrategyKind::Distance => Self::DistanceCountdown,
        }
    }
}

impl From<runout_config::WatchMode> for WatchMode {
    fn from(w: runout_config::WatchMode) -> Self {
        match w {
            runout_config::WatchMode::All => Self::All,
            runout_config::WatchMode::Active => Self::Active,
        }
    }
}

impl From<&runout_config::SensorCfg> for SensorMapping {
    fn from(s: &runout_config::SensorCfg) -> Self {
        Self {
            kind: match s.kind {
                runout_config::SensorKind::Switch => SensorKind::Switch,
                runout_config::SensorKind::Encoder => SensorKind::Encoder,
            },
            runout_level: s.runout_state == runout_config::RunoutLevel::High,
        }
    }
}

// ── MonitorConfig ────────────────────────────────────────────────────────────

impl From<&runout_config::Config> for MonitorConfig {
    fn from(c: &runout_config::Config) -> Self {
        let mut sensors = [SensorMapping::default(); MAX_SENSORS];
        for (i, slot) in sensors.iter_mut().enumerate() {
            *slot = SensorMapping::from(&c.sensor(i));
        }
        Self {
            enabled: c.monitor.enabled,
            strategy: c.monitor.strategy.into(),
            extruder_count: c.monitor.extruder_count,
            multi_sensor: c.monitor.multi_sensor,
            watch: c.monitor.watch.into(),
            debounce: DebounceCfg {
                threshold: c.debounce.threshold,
            },
            distance: DistanceCfg {
                runout_distance_mm: c.distance.runout_distance_mm,
            },
            encoder: EncoderCfg {
                min_pulses: c.encoder.min_pulses,
                window_ticks: c.encoder.window_ticks,
            },
            sensors,
        }
    }
}

// ── DispatchConfig ───────────────────────────────────────────────────────────

impl From<&runout_config::DispatchCfg> for DispatchConfig {
    fn from(c: &runout_config::DispatchCfg) -> Self {
        let script = c.runout_script.trim();
        Self {
            host_action_commands: c.host_action_commands,
            automatic_migration: c.automatic_migration,
            runout_script: (!script.is_empty()).then(|| script.to_string()),
        }
    }
}
