//! Registry events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to observe
//! what a [`TopicRegistry`](crate::TopicRegistry) does: topics coming and going,
//! subscriber state transitions, delivery failures, back-pressure and shutdown.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `TopicRegistry` (topics, subscribers, shutdown), topic fan-out
//!   (drops, rejections), topic dispatchers (handler failures/panics).
//! - **Consumers**: anything holding a receiver from `TopicRegistry::events()`.
//!
//! Events are observability only: the message path never waits on them.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
