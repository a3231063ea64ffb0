//! Directory-backed event store.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use logtail_types::{Event, Query};

use crate::error::StoreError;
use crate::EventStore;

/// Reads and appends newline-delimited JSON events in a log directory.
#[derive(Debug)]
pub struct LogRepository {
    log_directory: PathBuf,
    /// Serialises appends from this process so lines never interleave.
    write_lock: Mutex<()>,
}

impl LogRepository {
    pub fn new(log_directory: impl Into<PathBuf>) -> Self {
        Self {
            log_directory: log_directory.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The directory this repository reads from and writes to.
    pub fn log_directory(&self) -> &Path {
        &self.log_directory
    }

    /// Appends an event to the log file for the current UTC date.
    ///
    /// The file is picked from the clock at write time, not from the event's
    /// own timestamp, so a backdated event still lands after everything
    /// already written and a cursor never skips it.
    ///
    /// The directory and file are created if they do not exist. The whole
    /// line is written with a single `write_all` so concurrent readers see
    /// either nothing or a complete line in the common case.
    pub fn append(&self, event: &Event) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let path = self
            .log_directory
            .join(format!("{}.log", Utc::now().format("%Y-%m-%d")));

        fs::create_dir_all(&self.log_directory)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Returns every `*.log` file in the directory in write order.
    fn log_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = match fs::read_dir(&self.log_directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "log") && entry.file_type()?.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Reads every event in the directory in write order.
    fn read_all(&self) -> Result<Vec<Event>, StoreError> {
        let mut events = Vec::new();

        for path in self.log_files()? {
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                // Removed between listing and reading.
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            for (index, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Event>(line) {
                    Ok(event) => events.push(event),
                    Err(e) => {
                        // A torn trailing line is expected while a writer is mid-append.
                        tracing::debug!(
                            path = %path.display(),
                            line = index + 1,
                            "skipping unparseable log line: {}",
                            e
                        );
                    }
                }
            }
        }

        Ok(events)
    }
}

impl EventStore for LogRepository {
    fn find(&self, query: &Query) -> Result<Vec<Event>, StoreError> {
        let events = self.read_all()?;

        // A cursor that is no longer in the directory predates retained
        // history, so everything currently stored is after it.
        let start = match query.since_uuid.as_deref().filter(|uuid| !uuid.is_empty()) {
            Some(cursor) => events
                .iter()
                .position(|event| event.uuid == cursor)
                .map_or(0, |index| index + 1),
            None => 0,
        };

        let mut matched: Vec<Event> = events
            .into_iter()
            .skip(start)
            .filter(|event| query.matches(event))
            .collect();

        if query.reverse {
            matched.reverse();
        }

        Ok(matched)
    }

    fn last_uuid(&self) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.pop().map(|event| event.uuid))
    }
}
