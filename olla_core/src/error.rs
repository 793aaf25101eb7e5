use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OllaError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("sensor read failed on channel {channel}: {reason}")]
    Sensor { channel: usize, reason: String },
    #[error("valve write failed on channel {channel}: {reason}")]
    Valve { channel: usize, reason: String },
    #[error("invalid state: {0}")]
    State(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing controller configuration")]
    MissingConfig,
    #[error("no channels configured")]
    NoChannels,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
