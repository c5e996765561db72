use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValuationError {
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Quote error: {0}")]
    Quote(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ValuationError {
    fn from(err: serde_json::Error) -> Self {
        ValuationError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for ValuationError {
    fn from(err: std::io::Error) -> Self {
        ValuationError::Storage(err.to_string())
    }
}
