use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pin {0} was not opened")]
    UnknownPin(u8),
    #[error("read failed on pin {0}")]
    ReadFailed(u8),
    #[error("write failed on pin {0}")]
    WriteFailed(u8),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
