//! # Subscriber handle.
//!
//! [`SubscriberHandle`] identifies one subscription. It is a cheap clonable token:
//! dropping it does **not** unsubscribe a handler subscription. Use
//! [`TopicRegistry::unsubscribe`](crate::TopicRegistry::unsubscribe) for a
//! graceful stop or [`SubscriberHandle::close_now`] for a forced one.

use std::fmt;
use std::sync::Arc;

use crate::core::{Slot, StatsSnapshot, SubscriberId, SubscriberState};

/// Token for one subscription.
#[derive(Clone)]
pub struct SubscriberHandle {
    slot: Arc<Slot>,
}

impl SubscriberHandle {
    pub(crate) fn new(slot: Arc<Slot>) -> Self {
        Self { slot }
    }

    pub(crate) fn slot(&self) -> &Arc<Slot> {
        &self.slot
    }

    /// Unique subscription id.
    pub fn id(&self) -> SubscriberId {
        self.slot.id()
    }

    /// Topic this subscription listens to.
    pub fn topic(&self) -> &str {
        self.slot.topic_name()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SubscriberState {
        self.slot.state()
    }

    pub fn is_active(&self) -> bool {
        self.state() == SubscriberState::Active
    }

    /// Messages waiting in the queue.
    pub fn queued(&self) -> usize {
        self.slot.queued()
    }

    /// Queue capacity.
    pub fn capacity(&self) -> usize {
        self.slot.capacity()
    }

    /// Delivery counters of this subscription.
    pub fn stats(&self) -> StatsSnapshot {
        self.slot.stats()
    }

    /// Forced close: discards queued messages and goes straight to `Closed`.
    ///
    /// Returns `false` if it was already closed.
    pub fn close_now(&self) -> bool {
        self.slot.force_close()
    }

    /// Completes once the subscription is `Closed`.
    pub async fn closed(&self) {
        self.slot.wait_closed().await
    }
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id())
            .field("topic", &self.topic())
            .field("state", &self.state())
            .finish()
    }
}
