//! Stored log events and their wire representation.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Severity;

/// Display format for event timestamps on the wire.
const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A single immutable log record as stored.
///
/// `uuid` is assigned when the event is written and its assignment order
/// equals write order. Events are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub uuid: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub service: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Event {
    /// Creates an event stamped with the current time and a time-ordered UUID.
    pub fn new(service: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::now_v7().to_string(),
            timestamp: Utc::now(),
            severity,
            service: service.into(),
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Overrides the event timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Converts the event into its flat display form.
    pub fn format(&self) -> FormattedEvent {
        FormattedEvent {
            uuid: self.uuid.clone(),
            service: self.service.clone(),
            severity: self.severity.label().to_string(),
            timestamp: self
                .timestamp
                .with_timezone(&Local)
                .format(DISPLAY_TIME_FORMAT)
                .to_string(),
            message: self.message.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Flat, display-ready form of an [`Event`].
///
/// This is what viewers receive: one JSON object per event, both in the
/// historical page and as individual WebSocket messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedEvent {
    pub uuid: String,
    pub service: String,
    pub severity: String,
    pub timestamp: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}
