//! Raspberry Pi GPIO filament inputs.
//!
//! Switches are read as plain levels. Encoders count both edges from an
//! async interrupt so no pulse is lost between polling ticks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use rppal::gpio::{Gpio, InputPin, Level, Trigger};
use runout_traits::{BoxError, FilamentInput, RawSignal};

use crate::error::HwError;

/// Wiring of one sensor.
#[derive(Debug, Clone, Copy)]
pub enum GpioSensor {
    Switch { pin: u8 },
    Encoder { pin: u8 },
}

enum Channel {
    Switch(InputPin),
    // Pin kept alive so the interrupt stays registered.
    Encoder {
        _pin: InputPin,
        edges: Arc<AtomicU32>,
    },
}

pub struct GpioInput {
    channels: Vec<Channel>,
}

impl GpioInput {
    pub fn new(sensors: &[GpioSensor]) -> Result<Self, HwError> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
        let mut channels = Vec::with_capacity(sensors.len());
        for sensor in sensors {
            let channel = match *sensor {
                GpioSensor::Switch { pin } => {
                    let input = gpio
                        .get(pin)
                        .map_err(|e| HwError::Gpio(format!("open switch pin {pin}: {e}")))?
                        .into_input_pullup();
                    Channel::Switch(input)
                }
                GpioSensor::Encoder { pin } => {
                    let mut input = gpio
                        .get(pin)
                        .map_err(|e| HwError::Gpio(format!("open encoder pin {pin}: {e}")))?
                        .into_input_pullup();
                    let edges = Arc::new(AtomicU32::new(0));
                    let counter = edges.clone();
                    input
                        .set_async_interrupt(Trigger::Both, move |_level: Level| {
                            counter.fetch_add(1, Ordering::Relaxed);
                        })
                        .map_err(|e| HwError::Gpio(format!("encoder interrupt pin {pin}: {e}")))?;
                    Channel::Encoder { _pin: input, edges }
                }
            };
            tracing::debug!(?sensor, "filament input ready");
            channels.push(channel);
        }
        Ok(Self { channels })
    }
}

impl FilamentInput for GpioInput {
    fn read(&mut self, sensor: usize) -> Result<RawSignal, BoxError> {
        match self.channels.get(sensor) {
            Some(Channel::Switch(pin)) => Ok(RawSignal::Level(pin.is_high())),
            Some(Channel::Encoder { edges, .. }) => {
                Ok(RawSignal::Pulses(edges.load(Ordering::Relaxed)))
            }
            None => Err(Box::new(HwError::UnknownSensor(sensor))),
        }
    }
}
