use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("libre block must be 344 bytes, got {0}")]
    BlockSize(usize),
    #[error("failed to identify sensor type, patch info = {0}")]
    UnknownSensorType(String),
    #[error("web oop configuration incomplete: {0}")]
    RemoteConfig(&'static str),
}
