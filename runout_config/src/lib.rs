#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and trace loading for the runout monitor.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Recorded sensor traces (CSV) are loaded with strict headers for replay.
use runout_traits::MAX_SENSORS;
use serde::Deserialize;

/// Which response algorithm turns samples into a verdict.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Debounced,
    Distance,
}

/// Which extruders may fire a runout event.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// Any sensor can trigger.
    #[default]
    All,
    /// Only the currently active extruder can trigger.
    Active,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    #[default]
    Switch,
    Encoder,
}

/// Pin level a switch reports when filament is absent.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunoutLevel {
    High,
    #[default]
    Low,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MonitorCfg {
    pub enabled: bool,
    pub strategy: StrategyKind,
    pub extruder_count: usize,
    /// One sensor per extruder; recovery commands carry the tool index.
    pub multi_sensor: bool,
    pub watch: WatchMode,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: StrategyKind::Debounced,
            extruder_count: 1,
            multi_sensor: false,
            watch: WatchMode::All,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebounceCfg {
    /// Consecutive "absent" ticks before the verdict flips to out.
    pub threshold: u8,
}

impl Default for DebounceCfg {
    fn default() -> Self {
        Self { threshold: 5 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DistanceCfg {
    /// Extrusion allowed without motion confirmation before runout (mm).
    pub runout_distance_mm: f32,
}

impl Default for DistanceCfg {
    fn default() -> Self {
        Self {
            runout_distance_mm: 25.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EncoderCfg {
    /// Pulse edges needed inside the window to count as motion.
    pub min_pulses: u32,
    /// Window length in polling ticks.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DispatchCfg {
    pub host_action_commands: bool,
    pub automatic_migration: bool,
    /// Command injected on runout. Empty string requests the pause directly.
    pub runout_script: String,
}

impl Default for DispatchCfg {
    fn default() -> Self {
        Self {
            host_action_commands: false,
            automatic_migration: false,
            runout_script: "M600".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PollingCfg {
    pub period_ms: u64,
}

impl Default for PollingCfg {
    fn default() -> Self {
        Self { period_ms: 10 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
#[serde(default)]
pub struct SensorCfg {
    /// GPIO pin (BCM numbering); only needed for hardware builds.
    pub pin: Option<u8>,
    pub kind: SensorKind,
    pub runout_state: RunoutLevel,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorCfg,
    pub debounce: DebounceCfg,
    pub distance: DistanceCfg,
    pub encoder: EncoderCfg,
    pub dispatch: DispatchCfg,
    pub polling: PollingCfg,
    pub logging: Logging,
    /// Per-extruder sensor mapping. Empty means one default switch per extruder.
    pub sensors: Vec<SensorCfg>,
}

impl Config {
    /// Sensor mapping for extruder `index`, falling back to a default switch.
    pub fn sensor(&self, index: usize) -> SensorCfg {
        self.sensors.get(index).copied().unwrap_or_default()
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Monitor
        if self.monitor.extruder_count == 0 {
            eyre::bail!("monitor.extruder_count must be >= 1");
        }
        if self.monitor.extruder_count > MAX_SENSORS {
            eyre::bail!("monitor.extruder_count must be <= {MAX_SENSORS}");
        }

        // Debounce
        if self.debounce.threshold == 0 {
            eyre::bail!("debounce.threshold must be >= 1");
        }

        // Distance
        let d = self.distance.runout_distance_mm;
        if !d.is_finite() || d <= 0.0 {
            eyre::bail!("distance.runout_distance_mm must be > 0");
        }
        if d > 10_000.0 {
            eyre::bail!("distance.runout_distance_mm is unreasonably large (>10m)");
        }

        // Encoder
        if self.encoder.min_pulses == 0 {
            eyre::bail!("encoder.min_pulses must be >= 1");
        }
        if self.encoder.window_ticks == 0 {
            eyre::bail!("encoder.window_ticks must be >= 1");
        }

        // Dispatch
        if self.dispatch.runout_script.contains(['\n', '\r']) {
            eyre::bail!("dispatch.runout_script must be a single line");
        }

        // Polling
        if self.polling.period_ms == 0 || self.polling.period_ms > 1000 {
            eyre::bail!("polling.period_ms must be in [1, 1000]");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Sensors
        if !self.sensors.is_empty() && self.sensors.len() != self.monitor.extruder_count {
            eyre::bail!(
                "sensors must list exactly monitor.extruder_count ({}) entries, got {}",
                self.monitor.extruder_count,
                self.sensors.len()
            );
        }
        for (i, s) in self.sensors.iter().enumerate() {
            if let Some(pin) = s.pin
                && self.sensors[..i].iter().any(|o| o.pin == Some(pin))
            {
                eyre::bail!("sensors[{i}].pin {pin} is already used by another sensor");
            }
        }
        Ok(())
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// One recorded polling tick for one extruder.
///
/// Expected headers:
/// tick,extruder,present,pulses,distance_mm
///
/// Exactly one of `present` / `pulses` is filled per row:
/// tick,extruder,present,pulses,distance_mm
/// 0,0,true,,0.5
/// 0,1,,1042,0.5
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TraceRow {
    pub tick: u64,
    pub extruder: usize,
    pub present: Option<bool>,
    pub pulses: Option<u32>,
    pub distance_mm: f32,
}

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["tick", "extruder", "present", "pulses", "distance_mm"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "trace CSV must have headers 'tick,extruder,present,pulses,distance_mm', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<TraceRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        let line = idx + 2;
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {line}: {e}"))?;
        match (row.present, row.pulses) {
            (Some(_), Some(_)) => {
                eyre::bail!("row {line}: set either present or pulses, not both")
            }
            (None, None) => eyre::bail!("row {line}: one of present or pulses is required"),
            _ => {}
        }
        if row.extruder >= MAX_SENSORS {
            eyre::bail!("row {line}: extruder {} out of range", row.extruder);
        }
        if !row.distance_mm.is_finite() {
            eyre::bail!("row {line}: distance_mm must be finite");
        }
        if let Some(prev) = rows.last()
            && row.tick < prev.tick
        {
            eyre::bail!("row {line}: tick {} goes backwards (after {})", row.tick, prev.tick);
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_toml("").expect("parse empty");
        assert!(cfg.monitor.enabled);
        assert_eq!(cfg.monitor.strategy, StrategyKind::Debounced);
        assert_eq!(cfg.debounce.threshold, 5);
        assert_eq!(cfg.dispatch.runout_script, "M600");
        assert_eq!(cfg.sensor(3).kind, SensorKind::Switch);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn unknown_strategy_is_a_parse_error() {
        let err = load_toml("[monitor]\nstrategy = \"optical\"\n").expect_err("reject");
        assert!(err.to_string().contains("unknown variant"));
    }
}
