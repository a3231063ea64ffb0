//! The filter and resume cursor passed to the storage query engine.

use chrono::{DateTime, Utc};

use crate::{Event, Severity};

/// A filter plus resume cursor.
///
/// Once a query is handed to the subscription registry, only the registry
/// mutates it: it forces `reverse` off and advances `since_uuid` after every
/// notify pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Services to include. Empty means every service.
    pub services: Vec<String>,
    /// Minimum severity, inclusive.
    pub severity: Severity,
    /// Inclusive lower time bound. `None` is unbounded.
    pub since_time: Option<DateTime<Utc>>,
    /// Exclusive upper time bound. `None` is unbounded.
    pub until_time: Option<DateTime<Utc>>,
    /// Only return events written strictly after this UUID.
    pub since_uuid: Option<String>,
    /// Newest-first when true, oldest-first otherwise.
    pub reverse: bool,
}

impl Query {
    /// Returns true when the query carries a non-empty resume cursor.
    pub fn has_cursor(&self) -> bool {
        self.since_uuid.as_deref().is_some_and(|uuid| !uuid.is_empty())
    }

    /// Applies the service, severity, and time filters to a single event.
    ///
    /// The cursor is positional and is applied by the store, not here.
    pub fn matches(&self, event: &Event) -> bool {
        if !self.services.is_empty() && !self.services.iter().any(|s| *s == event.service) {
            return false;
        }
        if event.severity < self.severity {
            return false;
        }
        if self.since_time.is_some_and(|since| event.timestamp < since) {
            return false;
        }
        if self.until_time.is_some_and(|until| event.timestamp >= until) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(service: &str, severity: Severity) -> Event {
        Event::new(service, severity, "message")
    }

    #[test]
    fn empty_query_matches_everything() {
        let query = Query::default();
        assert!(query.matches(&event("lighting", Severity::Debug)));
        assert!(query.matches(&event("heating", Severity::Error)));
    }

    #[test]
    fn services_filter() {
        let query = Query {
            services: vec!["lighting".to_string(), "heating".to_string()],
            ..Default::default()
        };
        assert!(query.matches(&event("heating", Severity::Info)));
        assert!(!query.matches(&event("doorbell", Severity::Info)));
    }

    #[test]
    fn severity_is_inclusive_minimum() {
        let query = Query {
            severity: Severity::Warning,
            ..Default::default()
        };
        assert!(!query.matches(&event("lighting", Severity::Info)));
        assert!(query.matches(&event("lighting", Severity::Warning)));
        assert!(query.matches(&event("lighting", Severity::Error)));
    }

    #[test]
    fn time_bounds_are_half_open() {
        let now = Utc::now();
        let query = Query {
            since_time: Some(now - Duration::minutes(10)),
            until_time: Some(now),
            ..Default::default()
        };

        let at_since = event("lighting", Severity::Info).with_timestamp(now - Duration::minutes(10));
        let at_until = event("lighting", Severity::Info).with_timestamp(now);
        let before = event("lighting", Severity::Info).with_timestamp(now - Duration::minutes(11));

        assert!(query.matches(&at_since));
        assert!(!query.matches(&at_until));
        assert!(!query.matches(&before));
    }

    #[test]
    fn has_cursor_rejects_empty_string() {
        let mut query = Query::default();
        assert!(!query.has_cursor());
        query.since_uuid = Some(String::new());
        assert!(!query.has_cursor());
        query.since_uuid = Some("u1".to_string());
        assert!(query.has_cursor());
    }
}
