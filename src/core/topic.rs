//! # Topic: subscriber set, sequence counter and fan-out.
//!
//! ## Locking
//! - `fanout` (async mutex) is held for a whole fan-out, including waits under
//!   `Block`. Two publishes to one topic never interleave, so every subscriber sees
//!   the same relative order. The sequence counter is only advanced under it and
//!   can be read without it.
//! - `state` (sync mutex) guards the subscriber list and reference count. It is
//!   taken briefly, never across an `.await`, and always after the registry table lock.
//!
//! ## Fan-out
//! ```text
//! lock fanout ─► seq = next++ ─► snapshot Active slots (insertion order)
//!            ─► for each slot: push per BackpressurePolicy   (Block: in a spawned task)
//!                    Queued/Evicted ─► wake dispatcher (handler slots)
//!                    Full           ─► rejected += id
//!            ─► rejected.is_empty() ? Ok(seq) : Err(QueueFull)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use super::lock;
use super::slot::{Push, Slot, SubscriberId, SubscriberState};
use super::stats::DeliveryStats;
use crate::error::PubSubError;
use crate::events::{Bus, Event, EventKind};
use crate::messages::{Message, Payload};
use crate::policies::BackpressurePolicy;

#[derive(Default)]
struct TopicState {
    /// Non-closed subscribers in subscription order.
    subs: Vec<Arc<Slot>>,
    /// Live `TopicRef`s (publishers included).
    refs: usize,
    /// A dispatcher task has been spawned for this topic.
    dispatching: bool,
    /// Removed from the registry table; never reused.
    retired: bool,
}

/// One named channel.
pub(crate) struct Topic {
    name: Arc<str>,
    fanout: Arc<tokio::sync::Mutex<()>>,
    /// Written only under `fanout`.
    next_seq: AtomicU64,
    state: Mutex<TopicState>,
    work: Notify,
}

impl Topic {
    pub(crate) fn new(name: Arc<str>) -> Self {
        Self {
            name,
            fanout: Arc::new(tokio::sync::Mutex::new(())),
            next_seq: AtomicU64::new(0),
            state: Mutex::new(TopicState::default()),
            work: Notify::new(),
        }
    }

    #[inline]
    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Adds a subscriber; returns `true` if the caller must spawn the dispatcher.
    pub(crate) fn attach(&self, slot: Arc<Slot>) -> bool {
        let mut st = lock(&self.state);
        let spawn = slot.is_handler() && !st.dispatching;
        if spawn {
            st.dispatching = true;
        }
        st.subs.push(slot);
        spawn
    }

    /// Removes a subscriber; returns `true` if the topic is now unused.
    pub(crate) fn detach(&self, id: SubscriberId) -> bool {
        let mut st = lock(&self.state);
        st.subs.retain(|s| s.id() != id);
        st.subs.is_empty() && st.refs == 0
    }

    pub(crate) fn acquire_ref(&self) {
        lock(&self.state).refs += 1;
    }

    /// Drops one reference; returns `true` if the topic is now unused.
    pub(crate) fn release_ref(&self) -> bool {
        let mut st = lock(&self.state);
        st.refs = st.refs.saturating_sub(1);
        st.subs.is_empty() && st.refs == 0
    }

    /// No subscriber and no reference left.
    pub(crate) fn is_unused(&self) -> bool {
        let st = lock(&self.state);
        st.subs.is_empty() && st.refs == 0
    }

    /// Marks the topic as removed from the registry and wakes its dispatcher.
    pub(crate) fn retire(&self) {
        lock(&self.state).retired = true;
        self.work.notify_one();
    }

    pub(crate) fn is_retired(&self) -> bool {
        lock(&self.state).retired
    }

    pub(crate) fn slots(&self) -> Vec<Arc<Slot>> {
        lock(&self.state).subs.clone()
    }

    pub(crate) fn handler_slots(&self) -> Vec<Arc<Slot>> {
        lock(&self.state)
            .subs
            .iter()
            .filter(|s| s.is_handler())
            .cloned()
            .collect()
    }

    pub(crate) fn references(&self) -> usize {
        lock(&self.state).refs
    }

    /// Sequence number the next publish will get.
    pub(crate) fn next_seq(&self) -> u64 {
        self.next_seq.load(Ordering::Acquire)
    }

    pub(crate) fn work(&self) -> &Notify {
        &self.work
    }

    /// Publishes one message to every currently active subscriber.
    ///
    /// Once the sequence number is taken the fan-out always completes: under
    /// `Block` the pushes run in their own task, holding the fan-out lock, so a
    /// caller that stops waiting does not leave later subscribers without the message.
    pub(crate) async fn fanout(
        self: &Arc<Self>,
        payload: Payload,
        policy: BackpressurePolicy,
        bus: &Bus,
        stats: &DeliveryStats,
    ) -> Result<u64, PubSubError> {
        let guard = Arc::clone(&self.fanout).lock_owned().await;
        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel);

        let targets: Vec<Arc<Slot>> = lock(&self.state)
            .subs
            .iter()
            .filter(|s| s.state() == SubscriberState::Active)
            .cloned()
            .collect();

        let msg = Arc::new(Message::new(Arc::clone(&self.name), seq, payload));
        stats.record_published();

        let rejected = match policy {
            BackpressurePolicy::Block => {
                let topic = Arc::clone(self);
                let bus = bus.clone();
                let pushes = tokio::spawn(async move {
                    let mut rejected = Vec::new();
                    for slot in targets {
                        let outcome = slot.push_wait(Arc::clone(&msg)).await;
                        topic.settle(&slot, outcome, seq, &bus, &mut rejected);
                    }
                    drop(guard);
                    rejected
                });
                match pushes.await {
                    Ok(rejected) => rejected,
                    Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                    // Runtime is shutting down.
                    Err(_) => return Err(PubSubError::RegistryClosed),
                }
            }
            BackpressurePolicy::DropOldest | BackpressurePolicy::Reject => {
                let mut rejected = Vec::new();
                for slot in targets {
                    let outcome = if policy == BackpressurePolicy::DropOldest {
                        slot.push_evict(Arc::clone(&msg))
                    } else {
                        slot.try_push(Arc::clone(&msg))
                    };
                    self.settle(&slot, outcome, seq, bus, &mut rejected);
                }
                drop(guard);
                rejected
            }
        };

        if rejected.is_empty() {
            Ok(seq)
        } else {
            Err(PubSubError::QueueFull {
                topic: Arc::clone(&self.name),
                seq,
                rejected,
            })
        }
    }

    /// Reports one push outcome and wakes the dispatcher for handler slots.
    fn settle(
        &self,
        slot: &Slot,
        outcome: Push,
        seq: u64,
        bus: &Bus,
        rejected: &mut Vec<SubscriberId>,
    ) {
        match outcome {
            Push::Queued => {}
            Push::Evicted(old) => {
                tracing::debug!(
                    topic = %self.name,
                    subscriber = %slot.id(),
                    evicted_seq = old,
                    "queue full, dropped oldest message"
                );
                bus.emit(|| {
                    Event::new(EventKind::MessageDropped)
                        .with_topic(Arc::clone(&self.name))
                        .with_subscriber(slot.id())
                        .with_msg_seq(old)
                });
            }
            Push::Full => {
                tracing::debug!(
                    topic = %self.name,
                    subscriber = %slot.id(),
                    seq,
                    "queue full, message rejected"
                );
                bus.emit(|| {
                    Event::new(EventKind::PublishRejected)
                        .with_topic(Arc::clone(&self.name))
                        .with_subscriber(slot.id())
                        .with_msg_seq(seq)
                });
                rejected.push(slot.id());
                return;
            }
            Push::Inactive => return,
        }

        if slot.is_handler() {
            self.work.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::slot::Delivery;
    use std::sync::Weak;

    fn pull_slot(topic: &Arc<Topic>, capacity: usize, stats: &Arc<DeliveryStats>) -> Arc<Slot> {
        let slot = Arc::new(Slot::new(
            topic,
            capacity,
            Delivery::Pull,
            Arc::clone(stats),
            Weak::new(),
        ));
        topic.attach(Arc::clone(&slot));
        slot
    }

    #[tokio::test]
    async fn zero_subscribers_only_advances_seq() {
        let topic = Arc::new(Topic::new(Arc::from("empty")));
        let stats = DeliveryStats::default();
        let bus = Bus::new(8);

        for expected in 0..3 {
            let seq = topic
                .fanout(Payload::from("x"), BackpressurePolicy::Reject, &bus, &stats)
                .await
                .unwrap();
            assert_eq!(seq, expected);
        }
        assert_eq!(topic.next_seq(), 3);
        assert_eq!(stats.snapshot().enqueued, 0);
    }

    #[tokio::test]
    async fn reject_skips_only_the_full_subscriber() {
        let topic = Arc::new(Topic::new(Arc::from("chatter")));
        let stats = Arc::new(DeliveryStats::default());
        let bus = Bus::new(8);
        let small = pull_slot(&topic, 1, &stats);
        let big = pull_slot(&topic, 8, &stats);

        topic
            .fanout(Payload::from("a"), BackpressurePolicy::Reject, &bus, &stats)
            .await
            .unwrap();
        let err = topic
            .fanout(Payload::from("b"), BackpressurePolicy::Reject, &bus, &stats)
            .await
            .unwrap_err();

        match err {
            PubSubError::QueueFull { seq, rejected, .. } => {
                assert_eq!(seq, 1);
                assert_eq!(rejected, vec![small.id()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(small.queued(), 1);
        assert_eq!(big.queued(), 2);
    }

    #[tokio::test]
    async fn draining_subscribers_are_not_targets() {
        let topic = Arc::new(Topic::new(Arc::from("t")));
        let stats = Arc::new(DeliveryStats::default());
        let bus = Bus::new(8);
        let a = pull_slot(&topic, 4, &stats);
        let b = pull_slot(&topic, 4, &stats);

        a.try_push(Arc::new(Message::new(Arc::from("t"), 99, Payload::from("old"))));
        assert!(a.drain());

        topic
            .fanout(Payload::from("new"), BackpressurePolicy::Reject, &bus, &stats)
            .await
            .unwrap();
        assert_eq!(a.queued(), 1);
        assert_eq!(b.queued(), 1);
    }

    #[test]
    fn unused_after_last_ref_and_subscriber() {
        let topic = Arc::new(Topic::new(Arc::from("t")));
        let stats = Arc::new(DeliveryStats::default());
        topic.acquire_ref();
        let slot = pull_slot(&topic, 1, &stats);
        assert!(!topic.release_ref());
        assert!(topic.detach(slot.id()));
    }
}
