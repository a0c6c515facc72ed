//! Error types used by the topicbus registry and message handlers.
//!
//! This module defines two main error enums:
//!
//! - [`PubSubError`]: errors returned synchronously to publishers, subscribers and
//!   registry callers (routing, validation, back-pressure, lifecycle).
//! - [`HandlerError`]: errors returned by handler invocations; they are contained
//!   by the delivery scheduler and never reach the publisher.
//!
//! Both types provide `as_label` for logs/metrics.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::SubscriberId;

/// # Errors produced by the registry, publishers and subscribers.
///
/// None of them is fatal: the registry stays serviceable after any single failure.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PubSubError {
    /// Strict-mode publish (or publisher creation) for a topic that was never registered.
    #[error("unknown topic '{topic}'")]
    UnknownTopic {
        /// Requested topic name.
        topic: String,
    },

    /// Topic names must be non-empty.
    #[error("invalid topic name {topic:?}")]
    InvalidTopic {
        /// Offending topic name.
        topic: String,
    },

    /// Payload failed validation against the publisher's schema.
    #[error("payload rejected by schema '{schema}': {reason}")]
    SerializationError {
        /// Type tag of the schema that rejected the payload.
        schema: Arc<str>,
        /// Why validation failed.
        reason: String,
    },

    /// Reject back-pressure: some subscriber queues were full.
    ///
    /// The message still went to every subscriber not listed in `rejected`.
    #[error("queue full for {} subscriber(s) of '{topic}' at seq {seq}", rejected.len())]
    QueueFull {
        /// Topic the message was published to.
        topic: Arc<str>,
        /// Sequence number that was assigned to the message.
        seq: u64,
        /// Subscribers that did not receive the message.
        rejected: Vec<SubscriberId>,
    },

    /// A subscriber wait exceeded its timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Unsubscribe of an unknown or no longer active handle.
    #[error("subscriber {id} not found or no longer active")]
    NotFound {
        /// The handle's id.
        id: SubscriberId,
    },

    /// The registry has been shut down.
    #[error("registry is shut down")]
    RegistryClosed,

    /// Shutdown grace period was exceeded; the listed subscribers were force-closed.
    #[error("shutdown grace {grace:?} exceeded; forced: {stuck:?}")]
    GraceExceeded {
        /// Configured grace.
        grace: Duration,
        /// Subscribers that had to be force-closed.
        stuck: Vec<SubscriberId>,
    },
}

impl PubSubError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use topicbus::PubSubError;
    ///
    /// let err = PubSubError::UnknownTopic { topic: "chatter".into() };
    /// assert_eq!(err.as_label(), "unknown_topic");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            PubSubError::UnknownTopic { .. } => "unknown_topic",
            PubSubError::InvalidTopic { .. } => "invalid_topic",
            PubSubError::SerializationError { .. } => "serialization_error",
            PubSubError::QueueFull { .. } => "queue_full",
            PubSubError::Timeout { .. } => "timeout",
            PubSubError::NotFound { .. } => "not_found",
            PubSubError::RegistryClosed => "registry_closed",
            PubSubError::GraceExceeded { .. } => "grace_exceeded",
        }
    }
}

/// # Errors produced by handler invocations.
///
/// Every variant is counted as a delivery failure. Only [`HandlerError::Fatal`]
/// changes the subscription: it is force-closed after the failing message.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler failed for this message; delivery of later messages continues.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Handler can no longer accept messages; the subscription is closed.
    #[error("handler failed fatally: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Handler exceeded the configured handler timeout.
    #[error("handler timed out after {timeout:?}")]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        HandlerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Fatal { .. } => "handler_fatal",
            HandlerError::Timeout { .. } => "handler_timeout",
        }
    }

    /// True if the subscription must be closed after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HandlerError::Fatal { .. })
    }
}
