pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

use error::HwError;
use runout_traits::{BoxError, FilamentInput, RawSignal};

/// Behavior of one simulated sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimKind {
    /// Presence switch; `runout_level` is the pin level it reports when empty.
    Switch { runout_level: bool },
    /// Motion encoder advancing by `pulses_per_read` while filament moves.
    Encoder { pulses_per_read: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct SimSensor {
    pub kind: SimKind,
    /// Filament runs out after this many reads (never when `None`).
    pub runout_after: Option<u64>,
    /// Every n-th read fails, to exercise the stale-sample path.
    pub fail_every: Option<u64>,
}

impl SimSensor {
    pub fn switch(runout_level: bool) -> Self {
        Self {
            kind: SimKind::Switch { runout_level },
            runout_after: None,
            fail_every: None,
        }
    }

    pub fn encoder(pulses_per_read: u32) -> Self {
        Self {
            kind: SimKind::Encoder { pulses_per_read },
            runout_after: None,
            fail_every: None,
        }
    }

    pub fn runout_after(mut self, reads: u64) -> Self {
        self.runout_after = Some(reads);
        self
    }

    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SimChannel {
    reads: u64,
    pulses: u32,
}

/// Simulated filament inputs for bench runs and the CLI `watch` command.
#[derive(Debug, Clone)]
pub struct SimulatedInput {
    sensors: Vec<SimSensor>,
    channels: Vec<SimChannel>,
}

impl SimulatedInput {
    pub fn new(sensors: Vec<SimSensor>) -> Self {
        let channels = vec![SimChannel::default(); sensors.len()];
        Self { sensors, channels }
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    fn read_sensor(&mut self, sensor: usize) -> Result<RawSignal, HwError> {
        let (Some(cfg), Some(ch)) = (self.sensors.get(sensor), self.channels.get_mut(sensor))
        else {
            return Err(HwError::UnknownSensor(sensor));
        };
        ch.reads = ch.reads.saturating_add(1);
        if let Some(n) = cfg.fail_every
            && ch.reads % n == 0
        {
            return Err(HwError::NotResponding(sensor));
        }
        let empty = cfg.runout_after.is_some_and(|after| ch.reads > after);
        let signal = match cfg.kind {
            SimKind::Switch { runout_level } => {
                RawSignal::Level(if empty { runout_level } else { !runout_level })
            }
            SimKind::Encoder { pulses_per_read } => {
                if !empty {
                    ch.pulses = ch.pulses.wrapping_add(pulses_per_read);
                }
                RawSignal::Pulses(ch.pulses)
            }
        };
        tracing::trace!(sensor, reads = ch.reads, ?signal, "simulated read");
        Ok(signal)
    }
}

impl FilamentInput for SimulatedInput {
    fn read(&mut self, sensor: usize) -> Result<RawSignal, BoxError> {
        self.read_sensor(sensor).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, 2)]
    #[case(true, 2)]
    #[case(true, 0)]
    fn switch_flips_to_runout_level_after_budget(
        #[case] runout_level: bool,
        #[case] after: u64,
    ) {
        let mut input =
            SimulatedInput::new(vec![SimSensor::switch(runout_level).runout_after(after)]);
        for _ in 0..after {
            assert_eq!(input.read(0).unwrap(), RawSignal::Level(!runout_level));
        }
        assert_eq!(input.read(0).unwrap(), RawSignal::Level(runout_level));
        assert_eq!(input.read(0).unwrap(), RawSignal::Level(runout_level));
    }

    #[test]
    fn encoder_stops_counting_when_empty() {
        let mut input = SimulatedInput::new(vec![SimSensor::encoder(3).runout_after(1)]);
        assert_eq!(input.read(0).unwrap(), RawSignal::Pulses(3));
        assert_eq!(input.read(0).unwrap(), RawSignal::Pulses(3));
    }

    #[test]
    fn unknown_sensor_is_an_error() {
        let mut input = SimulatedInput::new(vec![SimSensor::switch(true)]);
        let err = input.read(4).unwrap_err();
        assert!(err.to_string().contains("unknown sensor index 4"));
    }
}
