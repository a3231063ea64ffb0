//! Error types for the live-tail layer.

/// Errors produced by the registry and the watch loop.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// A caller supplied an argument the operation cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The watcher was started without the configuration it needs.
    #[error("watcher misconfigured: {0}")]
    Configuration(String),

    /// The filesystem watch failed. Fatal to the watch loop.
    #[error("filesystem watch error: {0}")]
    Notify(#[from] notify::Error),
}
