//! Application-facing endpoints.
//!
//! ## Contents
//! - [`Publisher`] validates payloads and hands them to the registry for fan-out
//! - [`Subscriber`] pull subscription: `next()`, `into_stream()`, `close()`
//! - [`SubscriberHandle`] token of any subscription (state, stats, forced close)

mod handle;
mod publisher;
mod subscriber;

pub use handle::SubscriberHandle;
pub use publisher::Publisher;
pub use subscriber::Subscriber;
