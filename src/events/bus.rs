//! # Registry event bus.
//!
//! [`Bus`] carries [`Event`]s from the registry, topic fan-out and dispatchers to
//! every receiver handed out by `TopicRegistry::events()`.
//!
//! ## Rules
//! - **Lazy**: `emit` takes a builder and only runs it when a receiver exists, so the
//!   message path pays nothing for events nobody watches.
//! - **Never blocks**: a full ring overwrites the oldest event; slow receivers get
//!   `RecvError::Lagged(n)`.
//! - **No replay**: a receiver sees events emitted after it was created.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for registry events.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus keeping the last `capacity` events (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Builds and broadcasts an event if anyone is listening.
    pub fn emit(&self, build: impl FnOnce() -> Event) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        // A receiver may have gone away since the check; nothing to do then.
        let _ = self.tx.send(build());
    }

    /// New receiver for subsequent events.
    pub fn receiver(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
