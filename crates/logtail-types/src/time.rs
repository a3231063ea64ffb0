//! Local date-time handling for viewer-supplied time bounds.
//!
//! Browsers submit `datetime-local` inputs as `2024-03-01T09:30`: local time,
//! no timezone, minute precision. Bounds are converted to UTC on the way in
//! and back to local time for display.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Format of viewer-supplied time bounds.
pub const HTML_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Errors produced when parsing a viewer-supplied time bound.
#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    /// The input does not match [`HTML_TIME_FORMAT`].
    #[error("invalid time {input:?}: {source}")]
    Malformed {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The input names a local time that does not exist (e.g. inside a DST gap).
    #[error("time {0:?} does not exist in the local timezone")]
    Nonexistent(String),
}

/// Parses a local, timezone-less date-time into UTC.
///
/// Ambiguous local times (a DST fold) resolve to the earlier instant.
pub fn parse_local_time(input: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let naive = NaiveDateTime::parse_from_str(input, HTML_TIME_FORMAT).map_err(|source| {
        TimeParseError::Malformed {
            input: input.to_string(),
            source,
        }
    })?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| TimeParseError::Nonexistent(input.to_string()))
}

/// Formats a UTC instant as a local [`HTML_TIME_FORMAT`] string.
pub fn format_local_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format(HTML_TIME_FORMAT)
        .to_string()
}
