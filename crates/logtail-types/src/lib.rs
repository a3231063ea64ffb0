//! Shared types for the logtail service.
//!
//! This crate defines the stored log [`Event`], its wire representation
//! ([`FormattedEvent`]), the [`Severity`] scale, and the [`Query`] filter that
//! travels between the HTTP layer, the subscription registry, and the
//! storage query engine.
//!
//! No other logtail crate defines cross-cutting types; everything that more
//! than one crate needs to agree on lives here.

use serde::{Deserialize, Serialize};

mod event;
mod query;
mod time;

pub use event::{Event, FormattedEvent};
pub use query::Query;
pub use time::{format_local_time, parse_local_time, TimeParseError, HTML_TIME_FORMAT};

/// Log severity levels, ordered from least to most severe.
///
/// A [`Query`] carries a minimum severity; an event matches when its own
/// severity is greater than or equal to that minimum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Severity {
    /// Diagnostic detail.
    #[default]
    Debug = 0,
    /// Normal operation.
    Info = 1,
    /// Something unexpected that the service recovered from.
    Warning = 2,
    /// A failed operation.
    Error = 3,
}

impl Severity {
    /// Returns the numeric level for this severity.
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Converts an integer level to a severity.
    ///
    /// Out-of-range values clamp to the nearest level, so `0` and anything
    /// below it mean "everything" and anything above `3` means errors only.
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=0 => Self::Debug,
            1 => Self::Info,
            2 => Self::Warning,
            _ => Self::Error,
        }
    }

    /// Returns the string label for this severity.
    pub fn label(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
