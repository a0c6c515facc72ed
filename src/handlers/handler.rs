//! # Core handler trait
//!
//! `Handler` is the extension point for callback subscriptions. Each handler
//! subscription owns a bounded queue; the topic's dispatcher pops from it and
//! awaits `handle` one message at a time.
//!
//! ## Contract
//! - Messages arrive in publish order, one at a time per subscription.
//! - A slow handler delays the other handler subscriptions **of the same topic**
//!   (cooperative dispatch); other topics are unaffected.
//! - Errors and panics are contained by the dispatcher. Returning
//!   [`HandlerError::Fatal`] closes this subscription.
//! - [`Handler::queue_capacity`] overrides the registry default queue size.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::messages::Message;

/// Shared handle to a handler.
pub type HandlerRef = Arc<dyn Handler>;

/// Contract for message handlers.
///
/// Called from the topic's dispatcher task. Implementations should avoid blocking
/// the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles one message. The message is shared read-only with the topic's
    /// other subscribers.
    async fn handle(&self, msg: Arc<Message>) -> Result<(), HandlerError>;

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity; `None` uses `RegistryConfig::queue_capacity`.
    fn queue_capacity(&self) -> Option<usize> {
        None
    }
}
