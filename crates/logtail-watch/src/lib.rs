//! Live tailing for logtail.
//!
//! Two pieces cooperate here:
//!
//! - [`Registry`] maps each live viewer's delivery channel to its [`Query`]
//!   and, on every notify pass, queries the store for events after each
//!   subscriber's cursor and pushes them down the channel.
//! - [`LogWatcher`] owns a filesystem watch on the log directory and runs a
//!   notify pass whenever a file in it is written.
//!
//! ```text
//! fs write ──▶ LogWatcher ──▶ Registry::notify_all ──▶ EventStore::find ──▶ mpsc ──▶ viewer
//! ```
//!
//! # Delivery policy
//!
//! Delivery is lossy. Events are pushed with a non-blocking
//! `try_send`; when a subscriber's buffer is full the event is dropped for
//! that subscriber and the cursor still advances past it. A slow viewer can
//! never stall the watch loop or any other viewer.
//!
//! [`Query`]: logtail_types::Query

mod error;
mod registry;
mod watcher;

pub use error::WatchError;
pub use registry::{NotifyReport, Registry, SubscriberId};
pub use watcher::{is_write, LogWatcher};
