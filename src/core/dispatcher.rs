//! # Topic dispatcher: delivers queued messages to handler subscriptions.
//!
//! One dispatcher task runs per topic that has (or had) a handler subscription.
//! It is cooperative within the topic and independent across topics.
//!
//! ## Loop
//! ```text
//! loop {
//!   ├─► arm wakeup (topic.work)
//!   ├─► slots = handler subscriptions (Active + Draining, subscription order)
//!   ├─► exit if topic retired and no slots, or registry shut down
//!   ├─► for slot in slots:                      (round robin, one message each)
//!   │       msg = slot.begin_delivery()         (closes drained slots)
//!   │       deliver(msg)                        (timeout + catch_unwind)
//!   │       slot.end_delivery()
//!   └─► nothing delivered → wait for wakeup
//! }
//! ```
//!
//! ## Failure containment
//! - `Err(e)`: counted, logged (`warn`), `HandlerFailed` published; `Fatal` also
//!   force-closes that subscription.
//! - Timeout (`RegistryConfig::handler_timeout`): handled as `HandlerError::Timeout`.
//! - Panic: caught with `catch_unwind`, counted, logged, `HandlerPanicked` published.
//!
//! None of these stop the loop or reach the publisher.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a handler uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use super::slot::Slot;
use super::topic::Topic;
use crate::error::HandlerError;
use crate::events::{Bus, Event, EventKind};
use crate::messages::Message;

/// Delivery loop of one topic.
pub(crate) struct Dispatcher {
    topic: Arc<Topic>,
    bus: Bus,
    handler_timeout: Option<Duration>,
    runtime_token: CancellationToken,
}

impl Dispatcher {
    pub(crate) fn new(
        topic: Arc<Topic>,
        bus: Bus,
        handler_timeout: Option<Duration>,
        runtime_token: CancellationToken,
    ) -> Self {
        Self {
            topic,
            bus,
            handler_timeout,
            runtime_token,
        }
    }

    /// Spawns the loop on the current Tokio runtime.
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        tracing::debug!(topic = %self.topic.name(), "dispatcher started");
        loop {
            let notified = self.topic.work().notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.runtime_token.is_cancelled() {
                break;
            }
            let slots = self.topic.handler_slots();
            if slots.is_empty() && self.topic.is_retired() {
                break;
            }

            let mut delivered = false;
            for slot in &slots {
                if let Some(msg) = slot.begin_delivery() {
                    self.deliver(slot, msg).await;
                    slot.end_delivery();
                    delivered = true;
                }
            }
            if delivered {
                continue;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = self.runtime_token.cancelled() => break,
            }
        }
        tracing::debug!(topic = %self.topic.name(), "dispatcher stopped");
    }

    /// Invokes the slot's handler for one message and contains any failure.
    async fn deliver(&self, slot: &Slot, msg: Arc<Message>) {
        let Some(handler) = slot.handler() else {
            return;
        };
        let seq = msg.seq;
        let fut = AssertUnwindSafe(handler.handle(msg)).catch_unwind();

        let res = match self.handler_timeout {
            Some(timeout) => match time::timeout(timeout, fut).await {
                Ok(r) => r,
                Err(_elapsed) => Ok(Err(HandlerError::Timeout { timeout })),
            },
            None => fut.await,
        };

        match res {
            Ok(Ok(())) => slot.record_delivered(),
            Ok(Err(err)) => {
                slot.record_failure();
                tracing::warn!(
                    topic = %self.topic.name(),
                    subscriber = %slot.id(),
                    handler = handler.name(),
                    seq,
                    error = %err,
                    label = err.as_label(),
                    "delivery failed"
                );
                self.bus.emit(|| {
                    Event::new(EventKind::HandlerFailed)
                        .with_topic(Arc::clone(self.topic.name()))
                        .with_subscriber(slot.id())
                        .with_msg_seq(seq)
                        .with_reason(err.to_string())
                });
                if err.is_fatal() {
                    slot.force_close();
                }
            }
            Err(panic) => {
                slot.record_failure();
                let info = panic_message(panic.as_ref());
                tracing::warn!(
                    topic = %self.topic.name(),
                    subscriber = %slot.id(),
                    handler = handler.name(),
                    seq,
                    panic = %info,
                    "handler panicked"
                );
                self.bus.emit(|| {
                    Event::new(EventKind::HandlerPanicked)
                        .with_topic(Arc::clone(self.topic.name()))
                        .with_subscriber(slot.id())
                        .with_msg_seq(seq)
                        .with_reason(info)
                });
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
