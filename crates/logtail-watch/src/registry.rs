//! Subscription registry and the notify pass.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use logtail_store::EventStore;
use logtail_types::{Event, Query};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::error::WatchError;

/// Identity of one delivery channel.
///
/// Each live connection mints its own id; at most one registry entry exists
/// per id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered delivery channel and the query it was subscribed with.
struct Subscriber {
    sender: mpsc::Sender<Event>,
    query: Query,
}

/// Counts from a single notify pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Subscribers visited.
    pub subscribers: usize,
    /// Events enqueued on a delivery channel.
    pub delivered: usize,
    /// Events discarded because a channel was full or its receiver was gone.
    pub dropped: usize,
    /// Subscribers skipped because the store query failed.
    pub failed: usize,
}

/// Live subscribers keyed by delivery channel.
///
/// Uses `std::sync::Mutex`: `subscribe` and `unsubscribe` hold
/// it only for a map operation, and [`Registry::notify_all`] runs on the
/// blocking pool, so the lock is never held across an `.await`.
///
/// Every method can wait for a full notify pass, which scans the store once
/// per subscriber. Async callers reach the registry through
/// `tokio::task::spawn_blocking`.
pub struct Registry {
    store: Arc<dyn EventStore>,
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
}

impl Registry {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, Subscriber>> {
        // A panic mid-pass leaves the map itself consistent.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts delivering events matching `query` to `sender`.
    ///
    /// The query must carry a resume cursor: without one a live subscription
    /// would either replay all history or silently skip some of it.
    /// Subscribing an id that is already registered replaces its query.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::InvalidArgument` if `query.since_uuid` is unset
    /// or empty. Nothing is registered in that case.
    pub fn subscribe(
        &self,
        id: SubscriberId,
        sender: mpsc::Sender<Event>,
        query: Query,
    ) -> Result<(), WatchError> {
        if !query.has_cursor() {
            return Err(WatchError::InvalidArgument(
                "since_uuid not set in subscriber query".to_string(),
            ));
        }

        self.lock().insert(id, Subscriber { sender, query });
        tracing::debug!(subscriber = %id, "subscribed");
        Ok(())
    }

    /// Stops delivering to `id`. Does not close the channel.
    ///
    /// Unknown and already-removed ids are ignored.
    pub fn unsubscribe(&self, id: &SubscriberId) {
        if self.lock().remove(id).is_some() {
            tracing::debug!(subscriber = %id, "unsubscribed");
        }
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the query currently registered for `id`.
    pub fn snapshot(&self, id: &SubscriberId) -> Option<Query> {
        self.lock().get(id).map(|subscriber| subscriber.query.clone())
    }

    /// Runs one notify pass over every subscriber.
    ///
    /// The lock is held for the whole pass, so passes never overlap and
    /// subscribe/unsubscribe wait for the pass to finish. For each
    /// subscriber the query is forced oldest-first, the store is queried,
    /// each event is offered to the channel without blocking, and the cursor
    /// advances to the last event returned whether or not every send
    /// succeeded. Events dropped on a full channel are never redelivered.
    ///
    /// A failed store query is logged and the subscriber is skipped for this
    /// pass only.
    pub fn notify_all(&self) -> NotifyReport {
        let mut subscribers = self.lock();
        let mut report = NotifyReport {
            subscribers: subscribers.len(),
            ..Default::default()
        };

        for (id, subscriber) in subscribers.iter_mut() {
            subscriber.query.reverse = false;

            let events = match self.store.find(&subscriber.query) {
                Ok(events) => events,
                Err(e) => {
                    tracing::error!(subscriber = %id, "failed to get events for subscriber: {}", e);
                    report.failed += 1;
                    continue;
                }
            };

            let Some(last_uuid) = events.last().map(|event| event.uuid.clone()) else {
                continue;
            };

            let mut dropped = 0;
            for event in events {
                match subscriber.sender.try_send(event) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_) | TrySendError::Closed(_)) => dropped += 1,
                }
            }

            if dropped > 0 {
                // Debug only: this service may be tailing its own output.
                tracing::debug!(subscriber = %id, dropped, "delivery channel full, events dropped");
                report.dropped += dropped;
            }

            subscriber.query.since_uuid = Some(last_uuid);
        }

        report
    }
}
