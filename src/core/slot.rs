//! # Subscriber slot: bounded FIFO plus lifecycle state.
//!
//! A [`Slot`] is the registry-side half of a subscription. Fan-out pushes into it,
//! the topic dispatcher (handler subscriptions) or `Subscriber::next()` (pull
//! subscriptions) pops from it.
//!
//! ## State machine
//! ```text
//!            unsubscribe / close()            queue empty, nothing in flight
//!   Active ─────────────────────────► Draining ──────────────────────────────► Closed
//!     │                                   │                                      ▲
//!     └───────────────────────────────────┴────────── close_now() / Fatal ───────┘
//! ```
//! - Only `Active` slots accept new messages.
//! - `Closed` is terminal: the queue is empty and the slot is detached from its topic.
//!
//! ## Wakeups
//! - `readable` fires on every push and state change (pull receivers).
//! - `writable` fires on every pop and state change (blocked publishers).
//! - `closed` is cancelled exactly once, on the transition to `Closed`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::lock;
use super::registry::TopicRegistry;
use super::stats::{DeliveryStats, StatsSnapshot};
use super::topic::Topic;
use crate::handlers::Handler;
use crate::messages::Message;

/// Process-wide id source; ids are never reused.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique subscriber token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Lifecycle state of a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriberState {
    /// Receives new messages.
    Active,
    /// Receives nothing new; queued messages are still delivered.
    Draining,
    /// Terminal.
    Closed,
}

/// How queued messages leave the slot.
pub(crate) enum Delivery {
    /// Popped by `Subscriber::next()`.
    Pull,
    /// Popped by the topic dispatcher and passed to the handler.
    Handler(Arc<dyn Handler>),
}

/// Outcome of a push.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Push {
    Queued,
    /// Queued after evicting the message with this seq.
    Evicted(u64),
    Full,
    /// Slot no longer active; nothing queued.
    Inactive,
}

/// Why a slot reached `Closed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CloseReason {
    Drained,
    Forced,
}

impl CloseReason {
    pub(crate) fn as_label(&self) -> &'static str {
        match self {
            CloseReason::Drained => "drained",
            CloseReason::Forced => "forced",
        }
    }
}

/// Result of taking the next message for a pull receiver.
enum Take {
    Ready(Arc<Message>),
    Empty,
    Closed,
}

struct Queue {
    items: VecDeque<Arc<Message>>,
    state: SubscriberState,
    in_flight: bool,
}

/// Registry-side state of one subscription.
pub(crate) struct Slot {
    id: SubscriberId,
    topic_name: Arc<str>,
    capacity: usize,
    delivery: Delivery,
    queue: Mutex<Queue>,
    readable: Notify,
    writable: Notify,
    closed: CancellationToken,
    stats: DeliveryStats,
    global: Arc<DeliveryStats>,
    topic: Weak<Topic>,
    owner: Weak<TopicRegistry>,
}

impl Slot {
    pub(crate) fn new(
        topic: &Arc<Topic>,
        capacity: usize,
        delivery: Delivery,
        global: Arc<DeliveryStats>,
        owner: Weak<TopicRegistry>,
    ) -> Self {
        Self {
            id: SubscriberId::next(),
            topic_name: Arc::clone(topic.name()),
            capacity: capacity.max(1),
            delivery,
            queue: Mutex::new(Queue {
                items: VecDeque::with_capacity(capacity.clamp(1, 1024)),
                state: SubscriberState::Active,
                in_flight: false,
            }),
            readable: Notify::new(),
            writable: Notify::new(),
            closed: CancellationToken::new(),
            stats: DeliveryStats::default(),
            global,
            topic: Arc::downgrade(topic),
            owner,
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    #[inline]
    pub(crate) fn topic_name(&self) -> &Arc<str> {
        &self.topic_name
    }

    #[inline]
    pub(crate) fn topic(&self) -> Option<Arc<Topic>> {
        self.topic.upgrade()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn handler(&self) -> Option<&Arc<dyn Handler>> {
        match &self.delivery {
            Delivery::Handler(h) => Some(h),
            Delivery::Pull => None,
        }
    }

    #[inline]
    pub(crate) fn is_handler(&self) -> bool {
        matches!(self.delivery, Delivery::Handler(_))
    }

    pub(crate) fn kind_label(&self) -> &str {
        match &self.delivery {
            Delivery::Handler(h) => h.name(),
            Delivery::Pull => "pull",
        }
    }

    pub(crate) fn state(&self) -> SubscriberState {
        lock(&self.queue).state
    }

    pub(crate) fn queued(&self) -> usize {
        lock(&self.queue).items.len()
    }

    #[inline]
    pub(crate) fn is_owned_by(&self, registry: &TopicRegistry) -> bool {
        std::ptr::eq(self.owner.as_ptr(), registry)
    }

    pub(crate) fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Completes once the slot is `Closed`.
    pub(crate) async fn wait_closed(&self) {
        self.closed.cancelled().await
    }

    // ---------------------------
    // Producer side (fan-out)
    // ---------------------------

    /// Queues `msg` unless the slot is full or not active.
    pub(crate) fn try_push(&self, msg: Arc<Message>) -> Push {
        let outcome = {
            let mut q = lock(&self.queue);
            if q.state != SubscriberState::Active {
                Push::Inactive
            } else if q.items.len() >= self.capacity {
                Push::Full
            } else {
                q.items.push_back(msg);
                Push::Queued
            }
        };
        self.after_push(&outcome);
        outcome
    }

    /// Queues `msg`, evicting the oldest entry when full.
    pub(crate) fn push_evict(&self, msg: Arc<Message>) -> Push {
        let outcome = {
            let mut q = lock(&self.queue);
            if q.state != SubscriberState::Active {
                Push::Inactive
            } else {
                let evicted = if q.items.len() >= self.capacity {
                    q.items.pop_front().map(|old| old.seq)
                } else {
                    None
                };
                q.items.push_back(msg);
                match evicted {
                    Some(seq) => Push::Evicted(seq),
                    None => Push::Queued,
                }
            }
        };
        self.after_push(&outcome);
        outcome
    }

    /// Queues `msg`, waiting for room while the slot stays active.
    pub(crate) async fn push_wait(&self, msg: Arc<Message>) -> Push {
        loop {
            let notified = self.writable.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_push(Arc::clone(&msg)) {
                Push::Full => {}
                other => return other,
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = self.closed.cancelled() => return Push::Inactive,
            }
        }
    }

    fn after_push(&self, outcome: &Push) {
        match outcome {
            Push::Queued | Push::Evicted(_) => {
                self.stats.record_enqueued();
                self.global.record_enqueued();
                if let Push::Evicted(_) = outcome {
                    self.stats.record_dropped();
                    self.global.record_dropped();
                }
                self.readable.notify_waiters();
            }
            Push::Full => {
                self.stats.record_rejected();
                self.global.record_rejected();
            }
            Push::Inactive => {}
        }
    }

    // ---------------------------
    // Consumer side: pull
    // ---------------------------

    /// Waits for the next message; `None` is end-of-stream.
    pub(crate) async fn recv(&self) -> Option<Arc<Message>> {
        loop {
            let notified = self.readable.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.take() {
                Take::Ready(msg) => return Some(msg),
                Take::Closed => return None,
                Take::Empty => notified.await,
            }
        }
    }

    fn take(&self) -> Take {
        let mut q = lock(&self.queue);
        if let Some(msg) = q.items.pop_front() {
            drop(q);
            self.writable.notify_waiters();
            self.record_delivered();
            return Take::Ready(msg);
        }
        match q.state {
            SubscriberState::Active => Take::Empty,
            SubscriberState::Draining => {
                q.state = SubscriberState::Closed;
                drop(q);
                self.finish_close(CloseReason::Drained);
                Take::Closed
            }
            SubscriberState::Closed => Take::Closed,
        }
    }

    // ---------------------------
    // Consumer side: dispatcher
    // ---------------------------

    /// Pops the next message for the handler and marks it in flight.
    ///
    /// A draining slot with nothing left is closed here.
    pub(crate) fn begin_delivery(&self) -> Option<Arc<Message>> {
        let mut q = lock(&self.queue);
        if q.state == SubscriberState::Closed || q.in_flight {
            return None;
        }
        if let Some(msg) = q.items.pop_front() {
            q.in_flight = true;
            drop(q);
            self.writable.notify_waiters();
            return Some(msg);
        }
        if q.state == SubscriberState::Draining {
            q.state = SubscriberState::Closed;
            drop(q);
            self.finish_close(CloseReason::Drained);
        }
        None
    }

    /// Clears the in-flight mark; closes a draining slot whose queue is empty.
    pub(crate) fn end_delivery(&self) {
        let mut q = lock(&self.queue);
        q.in_flight = false;
        if q.state == SubscriberState::Draining && q.items.is_empty() {
            q.state = SubscriberState::Closed;
            drop(q);
            self.finish_close(CloseReason::Drained);
        }
    }

    pub(crate) fn record_delivered(&self) {
        self.stats.record_delivered();
        self.global.record_delivered();
    }

    pub(crate) fn record_failure(&self) {
        self.stats.record_failure();
        self.global.record_failure();
    }

    // ---------------------------
    // Lifecycle
    // ---------------------------

    /// `Active → Draining` (or straight to `Closed` when nothing is pending).
    ///
    /// Returns `false` if the slot was not active.
    pub(crate) fn drain(&self) -> bool {
        let closed_now = {
            let mut q = lock(&self.queue);
            if q.state != SubscriberState::Active {
                return false;
            }
            if q.items.is_empty() && !q.in_flight {
                q.state = SubscriberState::Closed;
                true
            } else {
                q.state = SubscriberState::Draining;
                false
            }
        };

        if let Some(registry) = self.owner.upgrade() {
            registry.on_draining(self);
        }
        if closed_now {
            self.finish_close(CloseReason::Drained);
        } else {
            self.readable.notify_waiters();
            self.writable.notify_waiters();
        }
        true
    }

    /// Forced `Active/Draining → Closed`, discarding the queue.
    ///
    /// Returns `false` if the slot was already closed.
    pub(crate) fn force_close(&self) -> bool {
        {
            let mut q = lock(&self.queue);
            if q.state == SubscriberState::Closed {
                return false;
            }
            q.state = SubscriberState::Closed;
            q.items.clear();
        }
        self.finish_close(CloseReason::Forced);
        true
    }

    /// Runs once per slot, after the state became `Closed`.
    fn finish_close(&self, reason: CloseReason) {
        self.closed.cancel();
        self.readable.notify_waiters();
        self.writable.notify_waiters();
        if let Some(registry) = self.owner.upgrade() {
            registry.release_slot(self, reason);
        }
    }
}
