//! logtail server library logic.

pub mod api_events;
pub mod api_ws;
pub mod config;
pub mod error;

use axum::{routing::get, Extension, Json, Router};
use logtail_store::EventStore;
use logtail_watch::Registry;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage query engine for historical pages and live passes.
    pub store: Arc<dyn EventStore>,
    /// Live subscribers, shared with the log watcher.
    pub registry: Arc<Registry>,
    /// Live-tail tuning.
    pub stream: config::StreamConfig,
    /// Static client files served for unmatched paths, if any.
    pub static_dir: Option<String>,
    /// Flips to `true` when the server is shutting down, ending live tails.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Trailing window used when a request gives no time bounds.
    pub fn default_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.stream.default_window_minutes)
    }
}

/// Health check handler.
///
/// The subscriber count waits for any notify pass in progress, so it is read
/// on the blocking pool.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let registry = Arc::clone(&state.registry);
    let subscribers = match tokio::task::spawn_blocking(move || registry.len()).await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::error!("failed to count subscribers: {}", e);
            None
        }
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "subscribers": subscribers,
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/api/events", get(api_events::get_events_handler))
        .route("/ws", get(api_ws::ws_handler));

    let router = match state.static_dir.as_deref() {
        Some(dir) if Path::new(dir).join("index.html").exists() => {
            tracing::info!(path = %dir, "serving client static files");
            let index = Path::new(dir).join("index.html");
            router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)))
        }
        Some(dir) => {
            tracing::warn!(path = %dir, "static directory has no index.html, skipping static file serving");
            router
        }
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
