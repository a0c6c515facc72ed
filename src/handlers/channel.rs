//! # Queue-based pull handler.
//!
//! [`ChannelHandler`] turns a callback subscription into a channel the
//! application pulls from at its own pace. The handler awaits channel capacity,
//! so a slow consumer holds the message in the subscription queue and
//! back-pressure applies as configured. Once the receiver is dropped, the handler
//! returns [`HandlerError::Fatal`] and the subscription is closed.
//!
//! ```text
//! dispatcher ──► ChannelHandler::handle ──► mpsc::Sender ──► app: rx.recv().await
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::Handler;
use crate::error::HandlerError;
use crate::messages::Message;

/// Handler that forwards every message into a bounded mpsc channel.
pub struct ChannelHandler {
    tx: mpsc::Sender<Arc<Message>>,
}

impl ChannelHandler {
    /// Creates the handler and the receiver it feeds (capacity clamped to 1).
    pub fn new(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Arc<Message>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Handler for ChannelHandler {
    async fn handle(&self, msg: Arc<Message>) -> Result<(), HandlerError> {
        self.tx.send(msg).await.map_err(|_| HandlerError::Fatal {
            error: "receiver dropped".into(),
        })
    }

    fn name(&self) -> &str {
        "channel"
    }
}
