//! Filesystem watch loop.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::WatchError;
use crate::registry::Registry;

/// Returns true for change events that mean file contents were written.
pub fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
    )
}

/// Watches the log directory and runs a notify pass on every write.
pub struct LogWatcher {
    registry: Arc<Registry>,
    log_directory: Option<PathBuf>,
    /// The active watch. Dropping it closes the event channel, which is how
    /// [`LogWatcher::stop`] ends [`LogWatcher::start`].
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl LogWatcher {
    pub fn new(registry: Arc<Registry>, log_directory: Option<PathBuf>) -> Self {
        Self {
            registry,
            log_directory,
            watcher: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<RecommendedWatcher>> {
        self.watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Watches the log directory until stopped or the watch fails.
    ///
    /// Any write to a file in the directory triggers
    /// [`Registry::notify_all`]. Filenames are not checked, so a write to a
    /// non-log file also runs a pass. Other change kinds are ignored.
    ///
    /// Returns `Ok(())` when [`LogWatcher::stop`] releases the watch.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::Configuration` if no log directory is set, and
    /// `WatchError::Notify` if the watch cannot be opened or reports an
    /// error. A watch error is fatal: the loop exits and the caller is
    /// expected to shut the service down.
    pub async fn start(&self) -> Result<(), WatchError> {
        let log_directory = self
            .log_directory
            .as_ref()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| WatchError::Configuration("log directory is not set".to_string()))?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            // The receiver is gone only once the loop below has exited.
            let _ = tx.send(res);
        })?;
        watcher.watch(log_directory, RecursiveMode::NonRecursive)?;
        *self.slot() = Some(watcher);

        tracing::info!(path = %log_directory.display(), "watching log directory for changes");

        let result = loop {
            match rx.recv().await {
                Some(Ok(event)) => {
                    if is_write(&event.kind) {
                        self.notify().await;
                    }
                }
                Some(Err(e)) => {
                    tracing::error!(path = %log_directory.display(), "filesystem watch failed: {}", e);
                    break Err(WatchError::Notify(e));
                }
                // The watch was released by `stop`.
                None => break Ok(()),
            }
        };

        self.slot().take();
        tracing::info!(path = %log_directory.display(), "stopped watching log directory");
        result
    }

    /// Releases the active watch, ending [`LogWatcher::start`].
    ///
    /// Does nothing when no watch is active.
    pub fn stop(&self) {
        if self.slot().take().is_some() {
            tracing::debug!("released filesystem watch");
        }
    }

    /// Runs one notify pass on the blocking pool.
    ///
    /// Awaiting the pass before reading the next change event keeps passes
    /// strictly sequential.
    async fn notify(&self) {
        let registry = Arc::clone(&self.registry);
        match tokio::task::spawn_blocking(move || registry.notify_all()).await {
            Ok(report) => {
                tracing::trace!(
                    subscribers = report.subscribers,
                    delivered = report.delivered,
                    dropped = report.dropped,
                    failed = report.failed,
                    "notify pass complete"
                );
            }
            Err(e) => {
                tracing::error!("notify pass panicked or was cancelled: {}", e);
            }
        }
    }
}
