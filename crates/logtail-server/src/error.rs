//! HTTP error responses.

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use logtail_store::StoreError;
use logtail_types::TimeParseError;

/// Failures surfaced to a requester as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request carried a value that could not be parsed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The storage query engine failed.
    #[error("failed to query events: {0}")]
    UpstreamQuery(#[from] StoreError),

    /// Something went wrong inside this service.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamQuery(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TimeParseError> for ApiError {
    fn from(e: TimeParseError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidArgument(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
