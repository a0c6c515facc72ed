//! # Publisher.
//!
//! A [`Publisher`] holds a counted reference to its topic (the topic survives
//! while any publisher exists) and an optional [`Schema`]. It keeps no other
//! state: `send` takes `&self` and ordering across concurrent callers is decided
//! by the topic's fan-out lock.
//!
//! ```text
//! send(payload) ─► schema.validate ─► TopicRegistry::publish_to ─► Topic::fanout ─► seq
//!                    └─ Err(SerializationError)      └─ Err(RegistryClosed / QueueFull)
//! ```
//!
//! ## Example
//! ```rust
//! use topicbus::{Publisher, RegistryConfig, Schema, TopicRegistry};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), topicbus::PubSubError> {
//!     let registry = TopicRegistry::new(RegistryConfig::default());
//!     let talker = Publisher::new(&registry, "chatter")?
//!         .with_schema(Schema::utf8("std_msgs/String"));
//!
//!     assert_eq!(talker.send(b"Hello, world: 0".to_vec()).await?, 0);
//!     assert!(talker.send(vec![0xff, 0xfe]).await.is_err());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use crate::core::{TopicRef, TopicRegistry};
use crate::error::PubSubError;
use crate::messages::{Payload, Schema};

/// Sends messages to one topic.
#[derive(Clone, Debug)]
pub struct Publisher {
    topic: TopicRef,
    schema: Option<Schema>,
}

impl Publisher {
    /// Creates a publisher for `topic` (see [`TopicRegistry::publisher`]).
    pub fn new(registry: &Arc<TopicRegistry>, topic: &str) -> Result<Self, PubSubError> {
        registry.publisher(topic)
    }

    pub(crate) fn from_ref(topic: TopicRef) -> Self {
        Self {
            topic,
            schema: None,
        }
    }

    /// Validates every payload against `schema` before sending.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Topic name.
    pub fn topic(&self) -> &str {
        self.topic.name()
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Validates and publishes `payload`; returns its sequence number.
    ///
    /// Suspends only under `BackpressurePolicy::Block`.
    pub async fn send(&self, payload: impl Into<Payload>) -> Result<u64, PubSubError> {
        let payload = match &self.schema {
            Some(schema) => schema.validate(payload.into())?,
            None => payload.into(),
        };
        let registry = self.topic.registry().ok_or(PubSubError::RegistryClosed)?;
        registry.publish_to(self.topic.topic(), payload).await
    }
}
