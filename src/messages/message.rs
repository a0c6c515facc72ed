//! # Message envelope.
//!
//! A [`Message`] is built exactly once per fan-out, under the topic's fan-out lock,
//! and shared read-only (`Arc<Message>`) by every subscriber that receives it.
//!
//! ## Ordering guarantees
//! `seq` is assigned per topic, starts at 0 and increases by one per publish.
//! Every subscriber of a topic observes messages in `seq` order. There is no
//! ordering relation between different topics.

use std::sync::Arc;
use std::time::SystemTime;

use super::Payload;

/// Immutable published message.
#[derive(Clone, Debug)]
pub struct Message {
    /// Topic the message was published to.
    pub topic: Arc<str>,
    /// Per-topic sequence number.
    pub seq: u64,
    /// Wall-clock publish timestamp.
    pub at: SystemTime,
    /// Message body.
    pub payload: Payload,
}

impl Message {
    pub(crate) fn new(topic: Arc<str>, seq: u64, payload: Payload) -> Self {
        Self {
            topic,
            seq,
            at: SystemTime::now(),
            payload,
        }
    }

    /// Payload as text, if it is valid UTF-8.
    #[inline]
    pub fn text(&self) -> Option<&str> {
        self.payload.as_str()
    }
}
