//! Storage query engine for logtail.
//!
//! The rest of the workspace depends only on the [`EventStore`] trait: given
//! a [`Query`], return the matching events in order. [`LogRepository`] is the
//! concrete implementation, reading newline-delimited JSON events from the
//! `*.log` files of a single directory.
//!
//! # Contract
//!
//! [`EventStore::find`] must be idempotent and side-effect free. The live
//! subscription registry calls it once per subscriber on every filesystem
//! write, so repeating a query with an unchanged cursor must not change
//! anything.
//!
//! # File layout
//!
//! ```text
//! <log_directory>/
//!     2024-03-01.log   one JSON event per line, appended in write order
//!     2024-03-02.log
//! ```
//!
//! Write order is file-name order, then line order within a file.

mod error;
mod repository;

pub use error::StoreError;
pub use repository::LogRepository;

use logtail_types::{Event, Query};

/// Read access to stored log events.
pub trait EventStore: Send + Sync {
    /// Returns the events matching `query`.
    ///
    /// Results are oldest-first unless `query.reverse` is set, and only
    /// include events written strictly after `query.since_uuid` when a
    /// cursor is present.
    fn find(&self, query: &Query) -> Result<Vec<Event>, StoreError>;

    /// Returns the UUID of the most recently written event, ignoring all
    /// filters. `None` when nothing has been written yet.
    fn last_uuid(&self) -> Result<Option<String>, StoreError>;
}

#[cfg(test)]
mod tests;
