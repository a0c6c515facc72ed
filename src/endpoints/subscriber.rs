//! # Pull subscriber.
//!
//! A [`Subscriber`] owns a bounded queue fed by fan-out and hands messages to the
//! caller of [`Subscriber::next`]:
//!
//! ```text
//! next() ─► message queued?            ─► Ok(Some(msg))
//!        ─► closed (or drained)?       ─► Ok(None)           end-of-stream
//!        ─► wait: push / close / timeout
//!                                      ─► Err(Timeout)       timeout elapsed
//! ```
//!
//! ## Rules
//! - The sequence is lazy and infinite until the subscriber is closed. It cannot
//!   be restarted: subscribe again for a new one.
//! - `close()` is graceful and idempotent: messages already queued are still
//!   returned, then `next()` yields end-of-stream. A `next()` waiting on an empty
//!   queue returns end-of-stream immediately.
//! - `close_now()` and dropping the subscriber discard the queue.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream};
use tokio::time;

use super::SubscriberHandle;
use crate::core::TopicRegistry;
use crate::error::PubSubError;
use crate::messages::Message;

/// Pull-mode subscription.
#[derive(Debug)]
pub struct Subscriber {
    handle: SubscriberHandle,
    timeout: Option<Duration>,
}

impl Subscriber {
    /// Subscribes to `topic` with a queue of `queue_capacity` messages
    /// (see [`TopicRegistry::subscriber`]).
    pub fn new(
        registry: &Arc<TopicRegistry>,
        topic: &str,
        queue_capacity: usize,
    ) -> Result<Self, PubSubError> {
        registry.subscriber(topic, queue_capacity)
    }

    pub(crate) fn from_handle(handle: SubscriberHandle, timeout: Option<Duration>) -> Self {
        Self { handle, timeout }
    }

    /// Sets the timeout used by [`Subscriber::next`]; `Duration::ZERO` waits forever.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout).filter(|d| *d > Duration::ZERO);
        self
    }

    /// Handle of this subscription.
    pub fn handle(&self) -> &SubscriberHandle {
        &self.handle
    }

    /// Next message, `None` at end-of-stream, `Err(Timeout)` if the timeout elapsed.
    pub async fn next(&self) -> Result<Option<Arc<Message>>, PubSubError> {
        match self.timeout {
            Some(timeout) => self.next_timeout(timeout).await,
            None => Ok(self.handle.slot().recv().await),
        }
    }

    /// Like [`Subscriber::next`] with an explicit timeout.
    pub async fn next_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<Arc<Message>>, PubSubError> {
        time::timeout(timeout, self.handle.slot().recv())
            .await
            .map_err(|_| PubSubError::Timeout { timeout })
    }

    /// Graceful close (idempotent): stop receiving, keep what is queued.
    pub fn close(&self) {
        self.handle.slot().drain();
    }

    /// Forced close: discard the queue, end the stream now.
    pub fn close_now(&self) {
        self.handle.close_now();
    }

    /// Turns the subscriber into a stream that ends at end-of-stream.
    ///
    /// The receive timeout does not apply to the stream.
    pub fn into_stream(self) -> impl Stream<Item = Arc<Message>> + Send + 'static {
        stream::unfold(self, |sub| async move {
            let msg = sub.handle.slot().recv().await?;
            Some((msg, sub))
        })
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.handle.close_now();
    }
}
