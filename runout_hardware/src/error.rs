use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("unknown sensor index {0}")]
    UnknownSensor(usize),
    #[error("sensor {0} not responding")]
    NotResponding(usize),
}
