//! Message envelope, payload and payload schemas.
//!
//! ## Contents
//! - [`Message`] immutable envelope: topic, payload, per-topic `seq`, timestamp
//! - [`Payload`] opaque bytes plus an optional type tag
//! - [`Schema`] type tag plus optional validator, checked by [`Publisher`](crate::Publisher)
//!
//! Encoding is the caller's concern: the core only moves bytes.

mod message;
mod payload;
mod schema;

pub use message::Message;
pub use payload::{Payload, TEXT_TYPE};
pub use schema::Schema;
