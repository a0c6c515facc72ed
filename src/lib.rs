//! # topicbus
//!
//! **Topicbus** is an in-process, topic-based publish/subscribe core for Rust.
//!
//! Publishers send opaque payloads to named topics; every current subscriber of a
//! topic receives each message once, in publish order, through its own bounded
//! queue. Slow or failing subscribers never affect the publisher or each other
//! beyond the configured back-pressure policy.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐
//!     │  Publisher   │   │  Publisher   │      registry.publish(topic, payload)
//!     │ (+ Schema)   │   │              │                    │
//!     └──────┬───────┘   └──────┬───────┘                    │
//!            ▼                  ▼                            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TopicRegistry (explicit instance)                                │
//! │  - topic table (name → Topic, created on first use)               │
//! │  - Bus (broadcast events)                                         │
//! │  - DeliveryStats (registry-wide counters)                         │
//! └──────┬──────────────────────────────────────────────────┬─────────┘
//!        ▼                                                  ▼
//!  ┌─────────────────────────────┐             ┌─────────────────────────────┐
//!  │ Topic "chatter"             │             │ Topic "odom"                │
//!  │  fan-out lock + seq counter │             │  fan-out lock + seq counter │
//!  └──┬──────────┬──────────┬────┘             └──┬──────────────────────────┘
//!     ▼          ▼          ▼                     ▼
//!  [queue S1] [queue S2] [queue S3]            [queue S4]
//!     │          │          │                     │
//!     │          ▼          ▼                     ▼
//!     │      Dispatcher (one per topic)       Dispatcher
//!     │       round robin, one msg each        ...
//!     │          │          │
//!     ▼          ▼          ▼
//! Subscriber  S2.handle  S3.handle   (Err / panic / timeout → counted, logged, event)
//!  ::next()
//! ```
//!
//! ### Subscriber lifecycle
//! ```text
//! subscribe ──► Active ──► (unsubscribe / close) ──► Draining ──► (queue empty) ──► Closed
//!                 └────────────── close_now / Fatal / drop(Subscriber) ───────────────┘
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                           |
//! |-------------------|-------------------------------------------------------------|----------------------------------------------|
//! | **Registry**      | Topics, subscriptions, fan-out, teardown.                   | [`TopicRegistry`], [`TopicRef`]              |
//! | **Endpoints**     | Send and receive messages.                                  | [`Publisher`], [`Subscriber`]                |
//! | **Handlers**      | Callback subscriptions driven by the topic dispatcher.      | [`Handler`], [`HandlerFn`], [`ChannelHandler`] |
//! | **Messages**      | Envelope, opaque payload, optional schema validation.       | [`Message`], [`Payload`], [`Schema`]         |
//! | **Policies**      | What a publish does when a queue is full.                   | [`BackpressurePolicy`]                       |
//! | **Events**        | Observe registry activity.                                  | [`Event`], [`EventKind`]                     |
//! | **Errors**        | Typed errors for callers and handlers.                      | [`PubSubError`], [`HandlerError`]            |
//! | **Configuration** | Centralize registry settings.                               | [`RegistryConfig`]                           |
//!
//! ## Optional features
//! - `logging`: exports the built-in `LogHandler` _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use topicbus::{HandlerFn, Message, Publisher, RegistryConfig, TopicRegistry};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), topicbus::PubSubError> {
//!     let registry = TopicRegistry::new(RegistryConfig::default());
//!
//!     // Callback subscription
//!     let printer = HandlerFn::arc("printer", |msg: Arc<Message>| async move {
//!         println!("I heard: [{}]", msg.text().unwrap_or_default());
//!         Ok::<_, topicbus::HandlerError>(())
//!     });
//!     registry.subscribe("chatter", printer)?;
//!
//!     // Pull subscription
//!     let listener = registry.subscriber("chatter", 10)?;
//!
//!     let talker = Publisher::new(&registry, "chatter")?;
//!     talker.send("Hello, world: 0").await?;
//!
//!     let msg = listener.next().await?.expect("open subscriber");
//!     assert_eq!(msg.seq, 0);
//!
//!     registry.shutdown().await
//! }
//! ```
mod config;
mod core;
mod endpoints;
mod error;
mod events;
mod handlers;
mod messages;
mod policies;

// ---- Public re-exports ----

pub use config::RegistryConfig;
pub use core::{StatsSnapshot, SubscriberId, SubscriberState, TopicInfo, TopicRef, TopicRegistry};
pub use endpoints::{Publisher, Subscriber, SubscriberHandle};
pub use error::{HandlerError, PubSubError};
pub use events::{Event, EventKind};
pub use handlers::{ChannelHandler, Handler, HandlerFn, HandlerRef};
pub use messages::{Message, Payload, Schema, TEXT_TYPE};
pub use policies::BackpressurePolicy;

// Optional: expose a simple built-in listener that logs every message (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use handlers::LogHandler;
