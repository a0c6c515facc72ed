//! # Topic registry - owner of topics, subscriptions and dispatchers.
//!
//! [`TopicRegistry`] is an explicit instance (never a global) created with
//! [`TopicRegistry::new`] and torn down with [`TopicRegistry::shutdown`].
//!
//! ## Architecture
//! ```text
//! register(name)        ─► table[name] (create) ─► TopicRef (refs += 1)
//! subscribe(name, h)    ─► table[name] (create) ─► Slot(Handler) ─► spawn Dispatcher (first one)
//! subscriber(name, cap) ─► table[name] (create) ─► Slot(Pull)    ─► Subscriber
//! publish(name, p)      ─► table[name] (create unless strict) ─► Topic::fanout
//! unsubscribe(handle)   ─► Slot::drain  (Active → Draining → Closed)
//!
//! Slot Closed / TopicRef dropped ─► topic unused? ─► retire + remove from table
//! ```
//!
//! ## Rules
//! - Topic names are non-empty.
//! - Strict mode: `publish` / `publisher` fail with `UnknownTopic` unless the topic
//!   exists (registered, subscribed, or held by a `TopicRef`).
//! - A topic is destroyed when its last subscriber closes and no `TopicRef`
//!   (publishers included) remains. A topic created by a bare `publish` stays until
//!   such an event happens, so its sequence counter keeps advancing.
//! - Lock order: table → topic state. Neither is held across an `.await`.
//!
//! ## Example
//! ```rust
//! use topicbus::{RegistryConfig, TopicRegistry};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), topicbus::PubSubError> {
//!     let registry = TopicRegistry::new(RegistryConfig::default());
//!     let s1 = registry.subscriber("chatter", 10)?;
//!     let s2 = registry.subscriber("chatter", 10)?;
//!
//!     assert_eq!(registry.publish("chatter", "hello").await?, 0);
//!     assert_eq!(registry.publish("chatter", "world").await?, 1);
//!
//!     for s in [&s1, &s2] {
//!         assert_eq!(s.next().await?.unwrap().text(), Some("hello"));
//!         assert_eq!(s.next().await?.unwrap().text(), Some("world"));
//!     }
//!     registry.shutdown().await
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use futures::future::join_all;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::dispatcher::Dispatcher;
use super::lock;
use super::shutdown::wait_for_shutdown_signal;
use super::slot::{CloseReason, Delivery, Slot, SubscriberId};
use super::stats::{DeliveryStats, StatsSnapshot};
use super::topic::Topic;
use crate::config::RegistryConfig;
use crate::endpoints::{Publisher, Subscriber, SubscriberHandle};
use crate::error::PubSubError;
use crate::events::{Bus, Event, EventKind};
use crate::handlers::HandlerRef;
use crate::messages::Payload;

/// Point-in-time description of a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicInfo {
    /// Topic name.
    pub name: String,
    /// Sequence number the next publish will get.
    pub next_seq: u64,
    /// Subscribers not yet closed (active or draining), in subscription order.
    pub subscribers: Vec<SubscriberId>,
    /// Live `TopicRef`s, publishers included.
    pub references: usize,
}

/// Registry of topics and their subscribers.
pub struct TopicRegistry {
    cfg: RegistryConfig,
    topics: Mutex<HashMap<Arc<str>, Arc<Topic>>>,
    bus: Bus,
    stats: Arc<DeliveryStats>,
    closed: AtomicBool,
    runtime_token: CancellationToken,
    dispatchers: Mutex<Vec<JoinHandle<()>>>,
}

impl TopicRegistry {
    /// Creates a new registry.
    pub fn new(cfg: RegistryConfig) -> Arc<Self> {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Arc::new(Self {
            cfg,
            topics: Mutex::new(HashMap::new()),
            bus,
            stats: Arc::new(DeliveryStats::default()),
            closed: AtomicBool::new(false),
            runtime_token: CancellationToken::new(),
            dispatchers: Mutex::new(Vec::new()),
        })
    }

    /// Registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.cfg
    }

    /// Creates the topic if absent and returns a counted reference to it.
    ///
    /// Idempotent: registering an existing topic returns another reference.
    pub fn register(self: &Arc<Self>, topic: &str) -> Result<TopicRef, PubSubError> {
        validate_name(topic)?;
        let mut table = lock(&self.topics);
        self.ensure_open()?;
        let t = self.entry(&mut table, topic);
        t.acquire_ref();
        Ok(TopicRef {
            topic: t,
            registry: Arc::downgrade(self),
        })
    }

    /// Subscribes `handler` to `topic`; messages are delivered by the topic dispatcher.
    ///
    /// Must be called from within a Tokio runtime (the first handler subscription
    /// of a topic spawns its dispatcher).
    pub fn subscribe(
        self: &Arc<Self>,
        topic: &str,
        handler: HandlerRef,
    ) -> Result<SubscriberHandle, PubSubError> {
        let capacity = handler
            .queue_capacity()
            .unwrap_or(self.cfg.queue_capacity)
            .max(1);
        let slot = self.attach(topic, capacity, Delivery::Handler(handler))?;
        Ok(SubscriberHandle::new(slot))
    }

    /// Creates a pull subscriber with its own queue of `queue_capacity` messages.
    ///
    /// `0` uses `RegistryConfig::queue_capacity`.
    pub fn subscriber(
        self: &Arc<Self>,
        topic: &str,
        queue_capacity: usize,
    ) -> Result<Subscriber, PubSubError> {
        let capacity = match queue_capacity {
            0 => self.cfg.queue_capacity_clamped(),
            n => n,
        };
        let slot = self.attach(topic, capacity, Delivery::Pull)?;
        Ok(Subscriber::from_handle(
            SubscriberHandle::new(slot),
            self.cfg.default_recv_timeout(),
        ))
    }

    /// Stops new deliveries to `handle`; queued messages are still delivered.
    ///
    /// Returns [`PubSubError::NotFound`] if the handle is not active (already
    /// unsubscribed, closed, or owned by another registry). Never fatal.
    pub fn unsubscribe(&self, handle: &SubscriberHandle) -> Result<(), PubSubError> {
        let slot = handle.slot();
        if slot.is_owned_by(self) && slot.drain() {
            Ok(())
        } else {
            Err(PubSubError::NotFound { id: slot.id() })
        }
    }

    /// Publishes `payload` to `topic`; returns the message sequence number.
    ///
    /// Auto-creates the topic unless the registry is strict. A topic created here
    /// stays in the table (keeping its seq counter) until a subscriber or `TopicRef`
    /// of it goes away, or [`prune_idle`](Self::prune_idle) runs. Publishing to an
    /// unbounded set of names grows the table accordingly.
    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Payload>,
    ) -> Result<u64, PubSubError> {
        validate_name(topic)?;
        let t = {
            let mut table = lock(&self.topics);
            self.ensure_open()?;
            if self.cfg.strict {
                table
                    .get(topic)
                    .cloned()
                    .ok_or_else(|| PubSubError::UnknownTopic {
                        topic: topic.to_string(),
                    })?
            } else {
                self.entry(&mut table, topic)
            }
        };
        self.publish_to(&t, payload.into()).await
    }

    /// Creates a publisher bound to `topic`.
    ///
    /// Strict registries require the topic to exist.
    pub fn publisher(self: &Arc<Self>, topic: &str) -> Result<Publisher, PubSubError> {
        validate_name(topic)?;
        let mut table = lock(&self.topics);
        self.ensure_open()?;
        let t = if self.cfg.strict {
            table
                .get(topic)
                .cloned()
                .ok_or_else(|| PubSubError::UnknownTopic {
                    topic: topic.to_string(),
                })?
        } else {
            self.entry(&mut table, topic)
        };
        t.acquire_ref();
        Ok(Publisher::from_ref(TopicRef {
            topic: t,
            registry: Arc::downgrade(self),
        }))
    }

    /// Sorted names of live topics.
    pub fn topics(&self) -> Vec<String> {
        let table = lock(&self.topics);
        let mut names: Vec<String> = table.keys().map(|k| k.to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Snapshot of one topic. Never waits for a fan-out in progress.
    pub fn topic_info(&self, topic: &str) -> Option<TopicInfo> {
        let t = lock(&self.topics).get(topic).cloned()?;
        Some(TopicInfo {
            name: t.name().to_string(),
            next_seq: t.next_seq(),
            subscribers: t.slots().iter().map(|s| s.id()).collect(),
            references: t.references(),
        })
    }

    /// Removes every topic without subscribers and without `TopicRef`s; returns how many.
    ///
    /// Such topics are left behind by bare `publish` calls. A pruned topic that is
    /// used again starts over at seq 0.
    pub fn prune_idle(&self) -> usize {
        let mut table = lock(&self.topics);
        let idle: Vec<Arc<Topic>> = table
            .values()
            .filter(|t| t.is_unused())
            .cloned()
            .collect();
        for t in &idle {
            self.remove_topic(&mut table, t);
        }
        idle.len()
    }

    /// Registry-wide delivery counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Receiver for registry events emitted from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.receiver()
    }

    /// True once `shutdown()` has started.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Tears the registry down.
    ///
    /// Refuses new operations, moves every subscriber to `Draining`, waits up to
    /// `RegistryConfig::grace` for all of them to close, force-closes the rest and
    /// stops the dispatchers. Subsequent calls return `Ok(())` immediately.
    ///
    /// Returns [`PubSubError::GraceExceeded`] listing force-closed subscribers.
    pub async fn shutdown(&self) -> Result<(), PubSubError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!(grace = ?self.cfg.grace, "registry shutdown requested");
        self.bus.emit(|| Event::new(EventKind::ShutdownRequested));

        let slots: Vec<Arc<Slot>> = {
            let table = lock(&self.topics);
            table.values().flat_map(|t| t.slots()).collect()
        };
        for slot in &slots {
            slot.drain();
        }

        let grace = self.cfg.grace;
        let drained = time::timeout(grace, join_all(slots.iter().map(|s| s.wait_closed()))).await;
        let res = match drained {
            Ok(_) => {
                self.bus.emit(|| Event::new(EventKind::AllClosedWithinGrace));
                Ok(())
            }
            Err(_) => {
                let stuck: Vec<SubscriberId> = slots
                    .iter()
                    .filter(|s| s.force_close())
                    .map(|s| s.id())
                    .collect();
                tracing::warn!(?grace, forced = stuck.len(), "shutdown grace exceeded");
                self.bus.emit(|| {
                    Event::new(EventKind::GraceExceeded)
                        .with_reason(format!("forced={}", stuck.len()))
                });
                Err(PubSubError::GraceExceeded { grace, stuck })
            }
        };

        let topics: Vec<Arc<Topic>> = lock(&self.topics).drain().map(|(_, t)| t).collect();
        for t in &topics {
            t.retire();
        }
        self.runtime_token.cancel();

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *lock(&self.dispatchers));
        for h in handles {
            if res.is_err() {
                // A handler may still be stuck in the forced delivery.
                h.abort();
            }
            let _ = h.await;
        }
        tracing::info!("registry shut down");
        res
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then runs [`shutdown`](Self::shutdown).
    ///
    /// If signal handlers cannot be installed, shuts down immediately.
    pub async fn shutdown_on_signal(&self) -> Result<(), PubSubError> {
        match wait_for_shutdown_signal().await {
            Ok(signal) => tracing::info!(signal = signal.as_label(), "shutdown signal received"),
            Err(err) => tracing::warn!(error = %err, "cannot listen for shutdown signals"),
        }
        self.shutdown().await
    }

    // ---------------------------
    // Crate-internal plumbing
    // ---------------------------

    pub(crate) async fn publish_to(
        &self,
        topic: &Arc<Topic>,
        payload: Payload,
    ) -> Result<u64, PubSubError> {
        self.ensure_open()?;
        topic
            .fanout(payload, self.cfg.backpressure, &self.bus, &self.stats)
            .await
    }

    /// Called by a slot after `Active → Draining`.
    pub(crate) fn on_draining(&self, slot: &Slot) {
        tracing::debug!(topic = %slot.topic_name(), subscriber = %slot.id(), "subscriber draining");
        self.bus.emit(|| {
            Event::new(EventKind::SubscriberDraining)
                .with_topic(Arc::clone(slot.topic_name()))
                .with_subscriber(slot.id())
        });
    }

    /// Called by a slot once it is `Closed`: detaches it and removes an unused topic.
    pub(crate) fn release_slot(&self, slot: &Slot, reason: CloseReason) {
        tracing::debug!(
            topic = %slot.topic_name(),
            subscriber = %slot.id(),
            reason = reason.as_label(),
            "subscriber closed"
        );
        self.bus.emit(|| {
            Event::new(EventKind::SubscriberClosed)
                .with_topic(Arc::clone(slot.topic_name()))
                .with_subscriber(slot.id())
                .with_reason(reason.as_label())
        });

        if let Some(topic) = slot.topic() {
            let mut table = lock(&self.topics);
            if topic.detach(slot.id()) {
                self.remove_topic(&mut table, &topic);
            }
        }
    }

    /// Called when a `TopicRef` is dropped.
    pub(crate) fn release_ref(&self, topic: &Arc<Topic>) {
        let mut table = lock(&self.topics);
        if topic.release_ref() {
            self.remove_topic(&mut table, topic);
        }
    }

    fn attach(
        self: &Arc<Self>,
        topic: &str,
        capacity: usize,
        delivery: Delivery,
    ) -> Result<Arc<Slot>, PubSubError> {
        validate_name(topic)?;
        let (slot, spawn) = {
            let mut table = lock(&self.topics);
            self.ensure_open()?;
            let t = self.entry(&mut table, topic);
            let slot = Arc::new(Slot::new(
                &t,
                capacity,
                delivery,
                Arc::clone(&self.stats),
                Arc::downgrade(self),
            ));
            let spawn = t.attach(Arc::clone(&slot)).then_some(t);
            (slot, spawn)
        };

        if let Some(t) = spawn {
            self.spawn_dispatcher(t);
        }

        tracing::debug!(
            topic = %slot.topic_name(),
            subscriber = %slot.id(),
            kind = slot.kind_label(),
            capacity = slot.capacity(),
            "subscriber added"
        );
        self.bus.emit(|| {
            Event::new(EventKind::SubscriberAdded)
                .with_topic(Arc::clone(slot.topic_name()))
                .with_subscriber(slot.id())
                .with_reason(slot.kind_label().to_string())
        });
        Ok(slot)
    }

    fn spawn_dispatcher(&self, topic: Arc<Topic>) {
        let handle = Dispatcher::new(
            topic,
            self.bus.clone(),
            self.cfg.handler_timeout(),
            self.runtime_token.clone(),
        )
        .spawn();

        let mut dispatchers = lock(&self.dispatchers);
        dispatchers.retain(|h| !h.is_finished());
        dispatchers.push(handle);
    }

    /// Get-or-create under the table lock.
    fn entry(&self, table: &mut HashMap<Arc<str>, Arc<Topic>>, name: &str) -> Arc<Topic> {
        if let Some(t) = table.get(name) {
            return Arc::clone(t);
        }
        let name: Arc<str> = Arc::from(name);
        let t = Arc::new(Topic::new(Arc::clone(&name)));
        table.insert(Arc::clone(&name), Arc::clone(&t));

        tracing::debug!(topic = %name, "topic created");
        self.bus
            .emit(|| Event::new(EventKind::TopicCreated).with_topic(name));
        t
    }

    fn remove_topic(&self, table: &mut HashMap<Arc<str>, Arc<Topic>>, topic: &Arc<Topic>) {
        let same = table
            .get(topic.name())
            .is_some_and(|current| Arc::ptr_eq(current, topic));
        if !same {
            return;
        }
        table.remove(topic.name());
        topic.retire();

        tracing::debug!(topic = %topic.name(), "topic removed");
        self.bus
            .emit(|| Event::new(EventKind::TopicRemoved).with_topic(Arc::clone(topic.name())));
    }

    fn ensure_open(&self) -> Result<(), PubSubError> {
        if self.is_closed() {
            Err(PubSubError::RegistryClosed)
        } else {
            Ok(())
        }
    }
}

fn validate_name(topic: &str) -> Result<(), PubSubError> {
    if topic.is_empty() {
        Err(PubSubError::InvalidTopic {
            topic: topic.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Counted reference to a topic.
///
/// While any `TopicRef` exists the topic (and its sequence counter) survives
/// even without subscribers. Cloning takes another reference.
pub struct TopicRef {
    topic: Arc<Topic>,
    registry: Weak<TopicRegistry>,
}

impl TopicRef {
    /// Topic name.
    pub fn name(&self) -> &str {
        self.topic.name()
    }

    pub(crate) fn topic(&self) -> &Arc<Topic> {
        &self.topic
    }

    pub(crate) fn registry(&self) -> Option<Arc<TopicRegistry>> {
        self.registry.upgrade()
    }
}

impl Clone for TopicRef {
    fn clone(&self) -> Self {
        self.topic.acquire_ref();
        Self {
            topic: Arc::clone(&self.topic),
            registry: Weak::clone(&self.registry),
        }
    }
}

impl Drop for TopicRef {
    fn drop(&mut self) {
        match self.registry.upgrade() {
            Some(registry) => registry.release_ref(&self.topic),
            None => {
                self.topic.release_ref();
            }
        }
    }
}

impl std::fmt::Debug for TopicRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicRef")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::sync::mpsc;

    use super::*;
    use crate::core::SubscriberState;
    use crate::error::HandlerError;
    use crate::handlers::{ChannelHandler, HandlerFn};
    use crate::messages::{Message, Schema};
    use crate::policies::BackpressurePolicy;

    fn registry() -> Arc<TopicRegistry> {
        TopicRegistry::new(RegistryConfig::default())
    }

    fn registry_with(f: impl FnOnce(&mut RegistryConfig)) -> Arc<TopicRegistry> {
        let mut cfg = RegistryConfig::default();
        f(&mut cfg);
        TopicRegistry::new(cfg)
    }

    async fn recv_seq(sub: &Subscriber) -> u64 {
        sub.next_timeout(Duration::from_secs(1))
            .await
            .unwrap()
            .expect("message")
            .seq
    }

    #[tokio::test]
    async fn chatter_is_seen_by_every_subscriber_in_order() {
        let registry = registry();
        let s1 = registry.subscriber("chatter", 10).unwrap();
        let s2 = registry.subscriber("chatter", 10).unwrap();

        assert_eq!(registry.publish("chatter", "hello").await.unwrap(), 0);
        assert_eq!(registry.publish("chatter", "world").await.unwrap(), 1);

        for s in [&s1, &s2] {
            let mut seen = Vec::new();
            for _ in 0..2 {
                let msg = s.next().await.unwrap().unwrap();
                seen.push((msg.seq, msg.text().unwrap().to_string()));
            }
            assert_eq!(seen, vec![(0, "hello".into()), (1, "world".into())]);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_publishers_produce_gapless_sequence() {
        let registry = registry();
        let first = registry.subscriber("counter", 512).unwrap();
        let second = registry.subscriber("counter", 512).unwrap();

        let (tx, mut rx) = mpsc::channel(512);
        let recorder = HandlerFn::new("recorder", move |msg: Arc<Message>| {
            let tx = tx.clone();
            async move {
                tx.send(msg.seq).await.ok();
                Ok::<_, HandlerError>(())
            }
        })
        .with_queue_capacity(512);
        let _handle = registry.subscribe("counter", Arc::new(recorder)).unwrap();

        let publisher = registry.publisher("counter").unwrap();

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let p = publisher.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..25 {
                    p.send("tick").await.unwrap();
                }
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        let expected: Vec<u64> = (0..100).collect();
        for sub in [&first, &second] {
            let mut seqs = Vec::new();
            for _ in 0..100 {
                seqs.push(recv_seq(sub).await);
            }
            assert_eq!(seqs, expected);
            assert_eq!(sub.handle().queued(), 0);
        }

        let mut handled = Vec::new();
        for _ in 0..100 {
            let seq = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            handled.push(seq);
        }
        assert_eq!(handled, expected);
    }

    #[tokio::test]
    async fn unsubscribed_handler_never_sees_later_messages() {
        let registry = registry();
        let keep = registry.subscriber("chatter", 10).unwrap();
        let (handler, mut rx) = ChannelHandler::new(10);
        let handle = registry.subscribe("chatter", handler).unwrap();

        registry.publish("chatter", "a").await.unwrap();
        assert_eq!(rx.recv().await.unwrap().seq, 0);

        registry.unsubscribe(&handle).unwrap();
        handle.closed().await;
        assert_eq!(handle.state(), SubscriberState::Closed);

        assert_eq!(registry.publish("chatter", "b").await.unwrap(), 1);
        assert_eq!(recv_seq(&keep).await, 0);
        assert_eq!(recv_seq(&keep).await, 1);
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_only_advances_seq() {
        let registry = registry();
        for expected in 0..3 {
            assert_eq!(registry.publish("empty", "x").await.unwrap(), expected);
        }
        let info = registry.topic_info("empty").unwrap();
        assert_eq!(info.next_seq, 3);
        assert!(info.subscribers.is_empty());

        let stats = registry.stats();
        assert_eq!(stats.published, 3);
        assert_eq!(stats.enqueued, 0);
        assert_eq!(registry.topics(), vec!["empty".to_string()]);
    }

    #[tokio::test]
    async fn close_unblocks_pending_next_with_end_of_stream() {
        let registry = registry();
        let sub = Arc::new(registry.subscriber("t", 4).unwrap());

        let waiter = {
            let sub = Arc::clone(&sub);
            tokio::spawn(async move { sub.next().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        sub.close();
        sub.close();
        let res = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(res.unwrap().is_none());
        assert_eq!(sub.handle().state(), SubscriberState::Closed);
        assert!(matches!(
            registry.unsubscribe(sub.handle()),
            Err(PubSubError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn close_keeps_queued_messages_then_ends() {
        let registry = registry();
        let sub = registry.subscriber("t", 4).unwrap();
        for _ in 0..3 {
            registry.publish("t", "x").await.unwrap();
        }
        sub.close();
        assert_eq!(sub.handle().state(), SubscriberState::Draining);

        let seqs: Vec<u64> = sub.into_stream().map(|m| m.seq).collect().await;
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn reject_reports_full_queue_and_still_delivers_elsewhere() {
        let registry = registry();
        let small = registry.subscriber("t", 1).unwrap();
        let big = registry.subscriber("t", 8).unwrap();

        assert_eq!(registry.publish("t", "a").await.unwrap(), 0);
        match registry.publish("t", "b").await {
            Err(PubSubError::QueueFull {
                topic,
                seq,
                rejected,
            }) => {
                assert_eq!(&*topic, "t");
                assert_eq!(seq, 1);
                assert_eq!(rejected, vec![small.handle().id()]);
            }
            other => panic!("unexpected: {other:?}"),
        }

        assert_eq!(recv_seq(&big).await, 0);
        assert_eq!(recv_seq(&big).await, 1);
        assert_eq!(recv_seq(&small).await, 0);
        assert!(matches!(
            small.next_timeout(Duration::from_millis(20)).await,
            Err(PubSubError::Timeout { .. })
        ));
        assert_eq!(small.handle().stats().rejected, 1);
        assert_eq!(registry.stats().rejected, 1);
    }

    #[tokio::test]
    async fn drop_oldest_evicts_and_reports() {
        let registry = registry_with(|c| c.backpressure = BackpressurePolicy::DropOldest);
        let mut events = registry.events();
        let sub = registry.subscriber("t", 2).unwrap();

        for expected in 0..3 {
            assert_eq!(registry.publish("t", "x").await.unwrap(), expected);
        }
        assert_eq!(recv_seq(&sub).await, 1);
        assert_eq!(recv_seq(&sub).await, 2);
        assert_eq!(sub.handle().stats().dropped, 1);

        loop {
            let ev = events.recv().await.unwrap();
            if ev.kind == EventKind::MessageDropped {
                assert_eq!(ev.msg_seq, Some(0));
                assert_eq!(ev.subscriber, Some(sub.handle().id()));
                break;
            }
        }
    }

    #[tokio::test]
    async fn block_waits_for_room_or_close() {
        let registry = registry_with(|c| c.backpressure = BackpressurePolicy::Block);
        let sub = registry.subscriber("t", 1).unwrap();
        registry.publish("t", "a").await.unwrap();

        let blocked = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.publish("t", "b").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!blocked.is_finished());

        assert_eq!(recv_seq(&sub).await, 0);
        assert_eq!(blocked.await.unwrap().unwrap(), 1);

        let blocked = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.publish("t", "c").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!blocked.is_finished());

        sub.close_now();
        assert_eq!(blocked.await.unwrap().unwrap(), 2);
        assert!(sub.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancelled_block_publish_still_reaches_every_subscriber() {
        let registry = registry_with(|c| c.backpressure = BackpressurePolicy::Block);
        let a = registry.subscriber("t", 1).unwrap();
        let b = registry.subscriber("t", 8).unwrap();
        registry.publish("t", "m0").await.unwrap();

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), registry.publish("t", "m1")).await;
        assert!(cancelled.is_err());

        assert_eq!(recv_seq(&a).await, 0);
        assert_eq!(recv_seq(&a).await, 1);
        assert_eq!(registry.publish("t", "m2").await.unwrap(), 2);
        assert_eq!(recv_seq(&a).await, 2);

        for seq in 0..3 {
            assert_eq!(recv_seq(&b).await, seq);
        }
    }

    #[tokio::test]
    async fn topic_info_does_not_wait_for_blocked_publish() {
        let registry = registry_with(|c| c.backpressure = BackpressurePolicy::Block);
        let sub = registry.subscriber("t", 1).unwrap();
        registry.publish("t", "a").await.unwrap();

        let blocked = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.publish("t", "b").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!blocked.is_finished());

        let info = registry.topic_info("t").unwrap();
        assert_eq!(info.next_seq, 2);
        assert_eq!(info.subscribers.len(), 1);

        assert_eq!(recv_seq(&sub).await, 0);
        assert_eq!(blocked.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn prune_idle_drops_topics_left_by_bare_publishes() {
        let registry = registry();
        registry.publish("a", "x").await.unwrap();
        registry.publish("b", "x").await.unwrap();
        let _sub = registry.subscriber("c", 1).unwrap();
        let _topic = registry.register("d").unwrap();

        assert_eq!(registry.prune_idle(), 2);
        assert_eq!(registry.topics(), vec!["c".to_string(), "d".to_string()]);
        assert_eq!(registry.prune_idle(), 0);

        assert_eq!(registry.publish("a", "x").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn strict_registry_requires_known_topics() {
        let registry = registry_with(|c| c.strict = true);

        assert!(matches!(
            registry.publish("nope", "x").await,
            Err(PubSubError::UnknownTopic { topic }) if topic == "nope"
        ));
        assert!(matches!(
            registry.publisher("nope"),
            Err(PubSubError::UnknownTopic { .. })
        ));

        let _topic = registry.register("known").unwrap();
        assert_eq!(registry.publish("known", "x").await.unwrap(), 0);

        let _sub = registry.subscriber("other", 1).unwrap();
        assert_eq!(registry.publish("other", "x").await.unwrap(), 0);
        assert!(registry.publisher("other").is_ok());
    }

    #[tokio::test]
    async fn empty_topic_names_are_invalid() {
        let registry = registry();
        assert!(matches!(
            registry.publish("", "x").await,
            Err(PubSubError::InvalidTopic { .. })
        ));
        assert!(matches!(
            registry.subscriber("", 1),
            Err(PubSubError::InvalidTopic { .. })
        ));
        assert!(registry.register("").is_err());
        assert!(registry.topics().is_empty());
    }

    #[tokio::test]
    async fn second_unsubscribe_is_not_found() {
        let registry = registry();
        let (handler, _rx) = ChannelHandler::new(1);
        let handle = registry.subscribe("t", handler).unwrap();

        registry.unsubscribe(&handle).unwrap();
        match registry.unsubscribe(&handle) {
            Err(PubSubError::NotFound { id }) => assert_eq!(id, handle.id()),
            other => panic!("unexpected: {other:?}"),
        }

        let other = TopicRegistry::new(RegistryConfig::default());
        let (handler, _rx2) = ChannelHandler::new(1);
        let foreign = other.subscribe("t", handler).unwrap();
        assert!(registry.unsubscribe(&foreign).is_err());
        assert!(foreign.is_active());
    }

    #[tokio::test]
    async fn handler_failures_and_panics_do_not_stop_dispatch() {
        let registry = registry();
        let mut events = registry.events();
        let (tx, mut rx) = mpsc::channel::<u64>(8);

        let handler = HandlerFn::arc("flaky", move |msg: Arc<Message>| {
            let tx = tx.clone();
            async move {
                match msg.seq {
                    0 => Err(HandlerError::fail("bad input")),
                    1 => panic!("boom"),
                    seq => {
                        let _ = tx.send(seq).await;
                        Ok(())
                    }
                }
            }
        });
        let handle = registry.subscribe("t", handler).unwrap();

        for _ in 0..3 {
            registry.publish("t", "x").await.unwrap();
        }
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(handle.stats().failures, 2);
        assert!(handle.is_active());

        let mut kinds = Vec::new();
        while kinds.len() < 2 {
            let ev = events.recv().await.unwrap();
            if ev.is_delivery_failure() {
                kinds.push((ev.kind, ev.msg_seq));
            }
        }
        assert_eq!(
            kinds,
            vec![
                (EventKind::HandlerFailed, Some(0)),
                (EventKind::HandlerPanicked, Some(1))
            ]
        );
    }

    #[tokio::test]
    async fn fatal_handler_error_closes_only_that_subscription() {
        let registry = registry();
        let keep = registry.subscriber("t", 4).unwrap();
        let (handler, rx) = ChannelHandler::new(1);
        let handle = registry.subscribe("t", handler).unwrap();
        drop(rx);

        registry.publish("t", "x").await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle.closed())
            .await
            .unwrap();
        assert_eq!(handle.state(), SubscriberState::Closed);
        assert_eq!(handle.stats().failures, 1);

        assert_eq!(registry.publish("t", "y").await.unwrap(), 1);
        assert_eq!(recv_seq(&keep).await, 0);
        assert_eq!(recv_seq(&keep).await, 1);
    }

    #[tokio::test]
    async fn slow_handler_is_timed_out() {
        let registry = registry_with(|c| c.handler_timeout = Duration::from_millis(20));
        let (tx, mut rx) = mpsc::channel::<u64>(8);
        let handler = HandlerFn::arc("slow-first", move |msg: Arc<Message>| {
            let tx = tx.clone();
            async move {
                if msg.seq == 0 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                let _ = tx.send(msg.seq).await;
                Ok::<_, HandlerError>(())
            }
        });
        let handle = registry.subscribe("t", handler).unwrap();

        registry.publish("t", "x").await.unwrap();
        registry.publish("t", "y").await.unwrap();
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(handle.stats().failures, 1);
    }

    #[tokio::test]
    async fn recv_timeout_from_config() {
        let registry = registry_with(|c| c.recv_timeout = Duration::from_millis(20));
        let sub = registry.subscriber("t", 1).unwrap();
        match sub.next().await {
            Err(PubSubError::Timeout { timeout }) => {
                assert_eq!(timeout, Duration::from_millis(20))
            }
            other => panic!("unexpected: {other:?}"),
        }

        let sub = sub.with_timeout(Duration::ZERO);
        registry.publish("t", "x").await.unwrap();
        assert_eq!(sub.next().await.unwrap().unwrap().seq, 0);
    }

    #[tokio::test]
    async fn topic_lives_while_referenced_or_subscribed() {
        let registry = registry();
        let mut events = registry.events();

        let topic = registry.register("t").unwrap();
        let again = topic.clone();
        let sub = registry.subscriber("t", 1).unwrap();
        assert_eq!(registry.topic_info("t").unwrap().references, 2);

        drop(sub);
        drop(topic);
        assert_eq!(registry.topics(), vec!["t".to_string()]);
        drop(again);
        assert!(registry.topics().is_empty());
        assert!(registry.topic_info("t").is_none());

        loop {
            let ev = events.recv().await.unwrap();
            if ev.kind == EventKind::TopicRemoved {
                assert_eq!(ev.topic.as_deref(), Some("t"));
                break;
            }
        }

        let publisher = registry.publisher("p").unwrap();
        publisher.send("x").await.unwrap();
        assert_eq!(publisher.send("y").await.unwrap(), 1);
        drop(publisher);
        assert!(registry.topics().is_empty());
    }

    #[tokio::test]
    async fn publisher_validates_schema() {
        let registry = registry();
        let sub = registry.subscriber("chatter", 4).unwrap();
        let talker = registry
            .publisher("chatter")
            .unwrap()
            .with_schema(Schema::utf8("std_msgs/String"));

        assert_eq!(talker.send(b"Hello, world: 0".to_vec()).await.unwrap(), 0);
        assert!(matches!(
            talker.send(vec![0xff]).await,
            Err(PubSubError::SerializationError { .. })
        ));
        assert_eq!(talker.send(b"Hello, world: 1".to_vec()).await.unwrap(), 1);

        let msg = sub.next().await.unwrap().unwrap();
        assert_eq!(msg.payload.type_tag(), Some("std_msgs/String"));
        assert_eq!(msg.text(), Some("Hello, world: 0"));
        assert_eq!(recv_seq(&sub).await, 1);
    }

    #[tokio::test]
    async fn shutdown_drains_handlers_and_refuses_new_work() {
        let registry = registry();
        let mut events = registry.events();
        let count = Arc::new(AtomicUsize::new(0));
        let handler = {
            let count = Arc::clone(&count);
            HandlerFn::arc("counter", move |_msg: Arc<Message>| {
                let count = Arc::clone(&count);
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, HandlerError>(())
                }
            })
        };
        let handle = registry.subscribe("t", handler).unwrap();
        let _idle = registry.subscriber("idle", 1).unwrap();
        let publisher = registry.publisher("t").unwrap();

        for _ in 0..3 {
            publisher.send("x").await.unwrap();
        }
        registry.shutdown().await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(handle.state(), SubscriberState::Closed);
        assert!(registry.is_closed());
        assert!(registry.topics().is_empty());
        assert_eq!(
            registry.publish("t", "x").await,
            Err(PubSubError::RegistryClosed)
        );
        assert_eq!(publisher.send("x").await, Err(PubSubError::RegistryClosed));
        assert!(registry.subscriber("t", 1).is_err());
        assert!(registry.shutdown().await.is_ok());

        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::ShutdownRequested));
        assert!(kinds.contains(&EventKind::AllClosedWithinGrace));
    }

    #[tokio::test]
    async fn shutdown_forces_subscribers_past_grace() {
        let registry = registry_with(|c| c.grace = Duration::from_millis(30));
        let stuck = registry.subscriber("t", 4).unwrap();
        registry.publish("t", "unread").await.unwrap();

        match registry.shutdown().await {
            Err(PubSubError::GraceExceeded { grace, stuck: ids }) => {
                assert_eq!(grace, Duration::from_millis(30));
                assert_eq!(ids, vec![stuck.handle().id()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(stuck.handle().state(), SubscriberState::Closed);
        assert!(stuck.next().await.unwrap().is_none());
    }
}
