use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunoutError {
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),
    #[error("collaborator failed: {0}")]
    Collaborator(String),
    #[error("extruder {index} out of range (configured: {count})")]
    ExtruderOutOfRange { index: usize, count: usize },
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing monitor config")]
    MissingConfig,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
