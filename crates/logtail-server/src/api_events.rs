//! Historical page handler and the request parsing shared with the live tail.
//!
//! Provides `GET /api/events`: one page of stored events matching the
//! request filters, plus the resume cursor a viewer hands back to `/ws` to
//! continue live from exactly where the page ended.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Extension, Query as QueryString},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use logtail_types::{format_local_time, parse_local_time, Event, FormattedEvent, Query, Severity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Filter parameters accepted by `/api/events` and `/ws`.
#[derive(Debug, Default, Deserialize)]
pub struct ReadParams {
    /// Comma-separated service names.
    pub services: Option<String>,
    /// Minimum severity level.
    pub severity: Option<i64>,
    /// Inclusive lower bound, `YYYY-MM-DDTHH:MM` local time.
    pub since_time: Option<String>,
    /// Exclusive upper bound, `YYYY-MM-DDTHH:MM` local time.
    pub until_time: Option<String>,
    /// Resume cursor.
    pub since_uuid: Option<String>,
    /// Newest-first when true.
    pub reverse: Option<bool>,
}

/// Response body for `GET /api/events`.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Matching events in display order.
    pub events: Vec<FormattedEvent>,
    /// The services filter, joined with ", ".
    pub services: String,
    pub severity: u8,
    /// Effective lower bound, local time.
    pub since_time: String,
    /// Effective upper bound, local time.
    pub until_time: String,
    /// Cursor for the live tail: the most recent event shown.
    pub last_uuid: Option<String>,
    pub reverse: bool,
}

impl HistoryResponse {
    fn new(query: &Query, events: &[Event], last_uuid: Option<String>) -> Self {
        Self {
            events: events.iter().map(Event::format).collect(),
            services: query.services.join(", "),
            severity: query.severity.level(),
            since_time: query.since_time.as_ref().map(format_local_time).unwrap_or_default(),
            until_time: query.until_time.as_ref().map(format_local_time).unwrap_or_default(),
            last_uuid,
            reverse: query.reverse,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Converts request parameters into a [`Query`].
///
/// Spaces in the services list are ignored. Empty strings count as unset.
///
/// # Errors
///
/// Returns `ApiError::InvalidArgument` if a time bound is malformed.
pub fn parse_query(params: &ReadParams) -> Result<Query, ApiError> {
    let services: Vec<String> = non_empty(&params.services)
        .map(|list| {
            list.split(',')
                .map(|s| s.replace(' ', ""))
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let since_time = non_empty(&params.since_time).map(parse_local_time).transpose()?;
    let until_time = non_empty(&params.until_time).map(parse_local_time).transpose()?;

    Ok(Query {
        services,
        severity: params.severity.map(Severity::from_level).unwrap_or_default(),
        since_time,
        until_time,
        since_uuid: non_empty(&params.since_uuid).map(str::to_string),
        reverse: params.reverse.unwrap_or(false),
    })
}

/// Parses extracted request parameters.
///
/// A query string the extractor could not deserialize (`severity=high`)
/// becomes `ApiError::InvalidArgument`, like a malformed time bound.
pub(crate) fn read_query(
    params: Result<QueryString<ReadParams>, QueryRejection>,
) -> Result<Query, ApiError> {
    let QueryString(params) = params?;
    parse_query(&params)
}

/// Fills unset time bounds with a trailing window ending at `now`.
pub fn apply_default_window(query: &mut Query, now: DateTime<Utc>, window: Duration) {
    if query.since_time.is_none() {
        query.since_time = Some(now - window);
    }
    if query.until_time.is_none() {
        query.until_time = Some(now);
    }
}

/// Returns the UUID of the most recent event in a batch.
///
/// Newest-first batches have it at the front, oldest-first at the back.
pub fn resume_cursor(events: &[Event], reverse: bool) -> Option<String> {
    let newest = if reverse { events.first() } else { events.last() };
    newest.map(|event| event.uuid.clone())
}

/// Runs a store query on the blocking pool.
pub(crate) async fn find_events(state: &AppState, query: Query) -> Result<Vec<Event>, ApiError> {
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || store.find(&query))
        .await
        .map_err(|e| ApiError::Internal(format!("task join error: {}", e)))?
        .map_err(ApiError::from)
}

/// Handler for `GET /api/events`.
pub async fn get_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    params: Result<QueryString<ReadParams>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let mut query = read_query(params).inspect_err(|e| {
        tracing::warn!("failed to parse read request: {}", e);
    })?;
    apply_default_window(&mut query, Utc::now(), state.default_window());

    let events = find_events(&state, query.clone()).await.inspect_err(|e| {
        tracing::error!(services = %query.services.join(","), "failed to find events: {}", e);
    })?;

    let last_uuid = resume_cursor(&events, query.reverse);
    Ok(Json(HistoryResponse::new(&query, &events, last_uuid)))
}
