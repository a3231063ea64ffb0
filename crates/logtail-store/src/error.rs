//! Error types for the storage layer.

/// Errors that can occur while reading or writing log files.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading the log directory or a log file failed.
    #[error("log store io error: {0}")]
    Io(#[from] std::io::Error),

    /// An event could not be serialized for writing.
    #[error("log store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
