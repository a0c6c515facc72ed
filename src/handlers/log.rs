//! # LogHandler: message printer
//!
//! Logs every message it receives through `tracing` at `INFO`.
//!
//! ## Example output
//! ```text
//! INFO topicbus::handlers::log: I heard: [Hello, world: 3] topic=chatter seq=3
//! INFO topicbus::handlers::log: I heard 4 binary bytes topic=chatter seq=4
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use super::Handler;
use crate::error::HandlerError;
use crate::messages::Message;

/// Message logger.
#[derive(Default)]
pub struct LogHandler;

impl LogHandler {
    /// Construct a new [`LogHandler`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for LogHandler {
    async fn handle(&self, msg: Arc<Message>) -> Result<(), HandlerError> {
        match msg.text() {
            Some(text) => {
                tracing::info!(topic = %msg.topic, seq = msg.seq, "I heard: [{text}]");
            }
            None => {
                tracing::info!(
                    topic = %msg.topic,
                    seq = msg.seq,
                    "I heard {} binary bytes",
                    msg.payload.len()
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "LogHandler"
    }
}
