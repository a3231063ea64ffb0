//! Shared setup for the server integration tests.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use logtail_server::{app, config::StreamConfig, AppState};
use logtail_store::{EventStore, LogRepository, StoreError};
use logtail_types::{Event, Query, Severity};
use logtail_watch::Registry;
use std::net::SocketAddr;
use std::sync::{mpsc, Arc, Mutex};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// A log directory, the repository over it, and app state wired to both.
pub struct Harness {
    pub dir: TempDir,
    pub repo: Arc<LogRepository>,
    pub registry: Arc<Registry>,
    pub state: AppState,
    pub shutdown: watch::Sender<bool>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("should create temp dir");
        let repo = Arc::new(LogRepository::new(dir.path()));
        let (state, shutdown) = state_for(repo.clone());
        let registry = state.registry.clone();
        Self {
            dir,
            repo,
            registry,
            state,
            shutdown,
        }
    }

    /// Appends an event for `service`, `minutes_ago` minutes in the past.
    pub fn write(&self, service: &str, minutes_ago: i64) -> Event {
        let event = Event::new(service, Severity::Info, format!("{service} event"))
            .with_timestamp(Utc::now() - Duration::minutes(minutes_ago));
        self.repo.append(&event).expect("append should succeed");
        event
    }

    /// Appends `n` recent `lighting` events, oldest first.
    pub fn seed_lighting(&self, n: i64) -> Vec<Event> {
        (0..n).map(|i| self.write("lighting", n + 1 - i)).collect()
    }
}

/// Builds app state over any store, with a small delivery buffer.
pub fn state_for(store: Arc<dyn EventStore>) -> (AppState, watch::Sender<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState {
        registry: Arc::new(Registry::new(store.clone())),
        store,
        stream: StreamConfig {
            channel_capacity: 16,
            default_window_minutes: 60,
        },
        static_dir: None,
        shutdown: shutdown_rx,
    };
    (state, shutdown_tx)
}

/// Serves the app on an ephemeral port.
pub async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app(state).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    addr
}

/// Polls until the registry holds exactly `n` subscribers.
pub async fn wait_for_subscribers(registry: &Registry, n: usize) {
    for _ in 0..100 {
        if registry.len() == n {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("expected {n} subscribers, found {}", registry.len());
}

/// A store whose queries always fail.
pub struct BrokenStore;

impl EventStore for BrokenStore {
    fn find(&self, _query: &Query) -> Result<Vec<Event>, StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk unavailable")))
    }

    fn last_uuid(&self) -> Result<Option<String>, StoreError> {
        Err(StoreError::Io(std::io::Error::other("disk unavailable")))
    }
}

/// A store whose `find` signals when it is entered and then blocks until
/// released, holding a notify pass open.
pub struct GateStore {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl GateStore {
    /// Returns the store, a receiver signalled on each `find`, and the
    /// sender that lets a blocked `find` return.
    pub fn new() -> (Arc<Self>, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Arc::new(Self {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        (store, entered_rx, release_tx)
    }
}

impl EventStore for GateStore {
    fn find(&self, _query: &Query) -> Result<Vec<Event>, StoreError> {
        let _ = self.entered.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv();
        Ok(Vec::new())
    }

    fn last_uuid(&self) -> Result<Option<String>, StoreError> {
        Ok(None)
    }
}
