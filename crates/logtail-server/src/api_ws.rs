//! WebSocket live tail.
//!
//! `GET /ws` accepts the same filter parameters as `/api/events`. The
//! connection moves through
//!
//! ```text
//! Upgrading → Subscribed → Streaming → {ClosedByPeer | WriteError | ChannelClosed | Shutdown} → Unsubscribed
//! ```
//!
//! and every terminal state converges on a single unsubscribe.

use crate::api_events::{apply_default_window, find_events, read_query, resume_cursor, ReadParams};
use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{
        rejection::QueryRejection,
        ws::{Message, WebSocket},
        ConnectInfo, Extension, Query as QueryString, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use logtail_types::{Event, Query};
use logtail_watch::{Registry, SubscriberId};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::{mpsc, oneshot, watch};

/// How a streaming connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The viewer closed the socket or the read side failed.
    ClosedByPeer,
    /// Writing an event to the socket failed.
    WriteError,
    /// The delivery channel closed while still subscribed.
    ChannelClosed,
    /// The server is shutting down.
    Shutdown,
}

/// Unsubscribes exactly once, whichever exit path drops it.
///
/// Registry calls wait for a running notify pass to finish, so inside the
/// runtime the unsubscribe goes to the blocking pool.
struct Subscription {
    registry: Arc<Registry>,
    id: SubscriberId,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let registry = Arc::clone(&self.registry);
        let id = self.id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || registry.unsubscribe(&id));
            }
            Err(_) => registry.unsubscribe(&id),
        }
    }
}

/// Handler for `GET /ws`.
///
/// A `since_uuid` parameter seeds the subscription directly; the historical
/// page returns one as `last_uuid`. Without it the historical query is run
/// here to find the most recent event the viewer would have seen.
///
/// When that page is empty the cursor is the newest event in the store at
/// connect time. A viewer whose page came back with `last_uuid: null` misses
/// matching events written between loading the page and opening the socket.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
    params: Result<QueryString<ReadParams>, QueryRejection>,
) -> Response {
    let mut query = match read_query(params) {
        Ok(query) => query,
        Err(e) => {
            tracing::warn!(remote_addr = %addr, "rejected websocket request: {}", e);
            return e.into_response();
        }
    };

    if !query.has_cursor() {
        match initial_cursor(&state, &query).await {
            Ok(cursor) => query.since_uuid = cursor,
            Err(e) => {
                tracing::error!(remote_addr = %addr, "failed to resolve live cursor: {}", e);
                return e.into_response();
            }
        }
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, query, addr))
}

/// Finds the cursor a live subscription should start after.
///
/// This is the newest event on the default historical page, or failing that
/// the newest event in the store.
async fn initial_cursor(state: &AppState, query: &Query) -> Result<Option<String>, ApiError> {
    let mut history = query.clone();
    apply_default_window(&mut history, Utc::now(), state.default_window());
    let reverse = history.reverse;

    let events = find_events(state, history).await?;
    if let Some(cursor) = resume_cursor(&events, reverse) {
        return Ok(Some(cursor));
    }

    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || store.last_uuid())
        .await
        .map_err(|e| ApiError::Internal(format!("task join error: {}", e)))?
        .map_err(ApiError::from)
}

/// Drives one upgraded connection until it ends.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, query: Query, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();

    // Reading is what processes close, ping and pong frames. Any read error
    // or end of stream means the viewer is gone.
    let (done_tx, mut done_rx) = oneshot::channel::<()>();
    let read_task = tokio::spawn(async move {
        while let Some(Ok(_)) = receiver.next().await {}
        let _ = done_tx.send(());
    });

    let (tx, mut rx) = mpsc::channel::<Event>(state.stream.channel_capacity);
    let id = SubscriberId::new();

    let registry = Arc::clone(&state.registry);
    let subscribed = tokio::task::spawn_blocking(move || registry.subscribe(id, tx, query))
        .await
        .map_err(|e| e.to_string())
        .and_then(|result| result.map_err(|e| e.to_string()));

    if let Err(e) = subscribed {
        // The handler always resolves a cursor first, so this only happens
        // when the store is completely empty.
        tracing::error!(subscriber = %id, remote_addr = %addr, "failed to subscribe live connection: {}", e);
        read_task.abort();
        let _ = sender.send(Message::Close(None)).await;
        return;
    }
    let subscription = Subscription {
        registry: Arc::clone(&state.registry),
        id,
    };
    tracing::info!(subscriber = %id, remote_addr = %addr, "live connection subscribed");

    let shutdown = shutdown_requested(state.shutdown.clone());
    tokio::pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(event) => {
                    let payload = match serde_json::to_string(&event.format()) {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::error!(subscriber = %id, "failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sender.send(Message::Text(payload.into())).await {
                        tracing::warn!(subscriber = %id, "failed to write to websocket: {}", e);
                        break StreamOutcome::WriteError;
                    }
                }
                None => {
                    tracing::error!(subscriber = %id, "delivery channel closed unexpectedly");
                    break StreamOutcome::ChannelClosed;
                }
            },
            _ = &mut done_rx => break StreamOutcome::ClosedByPeer,
            () = &mut shutdown => break StreamOutcome::Shutdown,
        }
    };

    drop(subscription);
    read_task.abort();
    if outcome != StreamOutcome::ClosedByPeer {
        let _ = sender.close().await;
    }

    tracing::info!(subscriber = %id, remote_addr = %addr, outcome = ?outcome, "live connection closed");
}

/// Resolves once shutdown is requested.
async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    // A dropped sender means nobody can request shutdown any more.
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
