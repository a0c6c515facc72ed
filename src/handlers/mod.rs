//! # Message handlers for callback subscriptions.
//!
//! This module provides the [`Handler`] trait and built-in implementations used
//! with [`TopicRegistry::subscribe`](crate::TopicRegistry::subscribe).
//!
//! ## Architecture
//! ```text
//! publish ──► Topic fan-out ──► [queue S1] ─┐
//!                          └──► [queue S2] ─┼─► topic dispatcher ──► S1.handle(msg)
//!                                           │   (one per topic)  ──► S2.handle(msg)
//!                                           └─► Err / panic / timeout → counted + logged
//! ```
//!
//! ## Handler types
//! - [`HandlerFn`] wraps a closure (function-reference handler)
//! - [`ChannelHandler`] forwards into an mpsc channel (queue-based pull handler)
//! - `LogHandler` logs every text message (feature `logging`)
//!
//! ## Implementing custom handlers
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use topicbus::{Handler, HandlerError, Message};
//!
//! struct Counter;
//!
//! #[async_trait]
//! impl Handler for Counter {
//!     async fn handle(&self, msg: Arc<Message>) -> Result<(), HandlerError> {
//!         if msg.payload.is_empty() {
//!             return Err(HandlerError::fail("empty payload"));
//!         }
//!         Ok(())
//!     }
//! }
//! ```

mod channel;
mod handler;
mod handler_fn;
#[cfg(feature = "logging")]
mod log;

pub use channel::ChannelHandler;
pub use handler::{Handler, HandlerRef};
pub use handler_fn::HandlerFn;
#[cfg(feature = "logging")]
pub use log::LogHandler;
