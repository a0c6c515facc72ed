//! Registry core: topics, subscriber slots, dispatch and teardown.
//!
//! The public API from this module is [`TopicRegistry`] (plus the small value
//! types it hands out). Internal modules:
//! - [`registry`]: topic table, subscribe/unsubscribe/publish, shutdown;
//! - [`topic`]: per-topic subscriber set, sequence counter and fan-out;
//! - [`slot`]: per-subscriber bounded queue and state machine;
//! - [`dispatcher`]: per-topic delivery loop for handler subscriptions;
//! - [`stats`]: delivery counters;
//! - [`shutdown`]: OS signal handling for `shutdown_on_signal`.
//!
//! ## Wiring
//! ```text
//! Publisher::send ─► TopicRegistry ─► Topic::fanout ─► Slot (per subscriber)
//!                                                        ├─ Pull    ─► Subscriber::next()
//!                                                        └─ Handler ─► Dispatcher ─► Handler::handle
//! Slot Closed ─► TopicRegistry::release_slot ─► Topic::detach ─► (unused) retire + remove
//! ```

mod dispatcher;
mod registry;
mod shutdown;
mod slot;
mod stats;
mod topic;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use registry::{TopicInfo, TopicRef, TopicRegistry};
pub use slot::{SubscriberId, SubscriberState};
pub use stats::StatsSnapshot;

pub(crate) use slot::Slot;

/// Locks a std mutex, recovering the data if a panicking thread poisoned it.
///
/// Critical sections in this crate never leave state half-updated across a panic point.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
