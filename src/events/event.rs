//! # Registry events.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Topology events**: topics and subscribers appearing, draining, closing
//! - **Delivery events**: handler failures, drops and rejections under back-pressure
//! - **Shutdown events**: teardown progress
//!
//! The [`Event`] struct carries metadata such as timestamps, topic, subscriber
//! id, message sequence number and a reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. It is unrelated to message sequence numbers (`msg_seq`).
//!
//! ## Example
//! ```rust
//! use topicbus::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::HandlerFailed)
//!     .with_topic("chatter")
//!     .with_msg_seq(3)
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::HandlerFailed);
//! assert_eq!(ev.topic.as_deref(), Some("chatter"));
//! assert_eq!(ev.msg_seq, Some(3));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::core::SubscriberId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of registry events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Topology ===
    /// Topic entry created.
    ///
    /// Sets: `topic`
    TopicCreated,

    /// Topic entry destroyed (no subscribers, no references left).
    ///
    /// Sets: `topic`
    TopicRemoved,

    /// Subscriber added in the `Active` state.
    ///
    /// Sets: `topic`, `subscriber`, `reason` (handler name or `"pull"`)
    SubscriberAdded,

    /// Subscriber moved to `Draining`.
    ///
    /// Sets: `topic`, `subscriber`
    SubscriberDraining,

    /// Subscriber reached `Closed`.
    ///
    /// Sets: `topic`, `subscriber`, `reason` (`"drained"` or `"forced"`)
    SubscriberClosed,

    // === Delivery ===
    /// Handler returned an error or timed out.
    ///
    /// Sets: `topic`, `subscriber`, `msg_seq`, `reason`
    HandlerFailed,

    /// Handler panicked.
    ///
    /// Sets: `topic`, `subscriber`, `msg_seq`, `reason` (panic message)
    HandlerPanicked,

    /// Oldest queued message evicted under `DropOldest`.
    ///
    /// Sets: `topic`, `subscriber`, `msg_seq` (of the evicted message)
    MessageDropped,

    /// Message skipped a full subscriber under `Reject`.
    ///
    /// Sets: `topic`, `subscriber`, `msg_seq`
    PublishRejected,

    // === Shutdown ===
    /// `shutdown()` started.
    ShutdownRequested,

    /// Every subscriber drained within the grace period.
    AllClosedWithinGrace,

    /// Grace period exceeded; remaining subscribers were force-closed.
    ///
    /// Sets: `reason` (number of forced subscribers)
    GraceExceeded,
}

/// Registry event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Topic name, if applicable.
    pub topic: Option<Arc<str>>,
    /// Subscriber id, if applicable.
    pub subscriber: Option<SubscriberId>,
    /// Sequence number of the message involved, if applicable.
    pub msg_seq: Option<u64>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            topic: None,
            subscriber: None,
            msg_seq: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    #[inline]
    pub fn with_subscriber(mut self, id: SubscriberId) -> Self {
        self.subscriber = Some(id);
        self
    }

    #[inline]
    pub fn with_msg_seq(mut self, seq: u64) -> Self {
        self.msg_seq = Some(seq);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// True for handler failures and panics.
    #[inline]
    pub fn is_delivery_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::HandlerFailed | EventKind::HandlerPanicked
        )
    }
}
