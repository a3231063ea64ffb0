//! logtail server binary.
//!
//! Serves historical log pages and live WebSocket tails over axum, with a
//! filesystem watcher on the log directory driving live delivery. Shuts down
//! gracefully on SIGTERM/SIGINT, or when the watcher fails.

use logtail_server::{app, config, AppState};
use logtail_store::LogRepository;
use logtail_watch::{LogWatcher, Registry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("LOGTAIL_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration: the server cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    // Storage, registry and watcher
    let log_directory = config.logs.directory.clone();
    let store = Arc::new(LogRepository::new(log_directory.clone().unwrap_or_default()));
    let registry = Arc::new(Registry::new(store.clone()));
    let watcher = Arc::new(LogWatcher::new(registry.clone(), log_directory));

    let (watch_exit_tx, watch_exit_rx) = oneshot::channel::<()>();
    let watch_task = tokio::spawn({
        let watcher = watcher.clone();
        async move {
            if let Err(e) = watcher.start().await {
                tracing::error!("log watcher exited: {}", e);
            }
            let _ = watch_exit_tx.send(());
        }
    });

    // Build application
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = app(AppState {
        store,
        registry,
        stream: config.stream.clone(),
        static_dir: config.server.static_dir.clone(),
        shutdown: shutdown_rx,
    });
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting logtail server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address: is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal(watch_exit_rx).await;
        // Live tails never end on their own; tell them to close so the
        // graceful shutdown can finish.
        let _ = shutdown_tx.send(true);
    })
    .await
    .expect("server error");

    watcher.stop();
    if let Err(e) = watch_task.await {
        tracing::error!("log watcher task join error: {}", e);
    }

    tracing::info!("logtail server shut down");
}

/// Waits for SIGINT, SIGTERM, or the log watcher exiting.
///
/// Live tailing is the point of the service, so a dead watcher takes the
/// server down with it rather than serving stale pages.
async fn shutdown_signal(watch_exit: oneshot::Receiver<()>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
        _ = watch_exit => { tracing::warn!("log watcher stopped, initiating shutdown"); }
    }
}
