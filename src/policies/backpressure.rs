//! # Back-pressure policies for subscriber queues.
//!
//! [`BackpressurePolicy`] decides what a publish does when a subscriber queue is
//! already holding `capacity` messages.
//!
//! - [`BackpressurePolicy::Block`] the publisher waits for the subscriber to free a slot.
//! - [`BackpressurePolicy::DropOldest`] the oldest queued message is discarded (ring buffer).
//! - [`BackpressurePolicy::Reject`] the message skips that subscriber and the publish
//!   returns `QueueFull` (default).
//!
//! ## Choosing the right policy
//!
//! **Lossless, publisher can wait**:
//! ```text
//! BackpressurePolicy::Block       → publish suspends; fan-out order stays total
//! ```
//!
//! **Latest data matters most** (sensor streams):
//! ```text
//! BackpressurePolicy::DropOldest  → slow subscriber sees a gap, never stalls the publisher
//! ```
//!
//! **Caller decides**:
//! ```text
//! BackpressurePolicy::Reject      → publish returns QueueFull{rejected}, others still receive
//! ```
//!
//! A blocked publish holds the topic's fan-out lock: other publishers of the same
//! topic wait behind it, publishers of other topics are unaffected.

/// Policy applied when a subscriber queue is full at publish time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Suspend the publisher until the queue has room or the subscriber stops being active.
    Block,
    /// Discard the oldest queued message to make room.
    DropOldest,
    /// Skip the full subscriber and report `QueueFull` to the publisher (default).
    Reject,
}

impl BackpressurePolicy {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BackpressurePolicy::Block => "block",
            BackpressurePolicy::DropOldest => "drop_oldest",
            BackpressurePolicy::Reject => "reject",
        }
    }
}

impl Default for BackpressurePolicy {
    /// Returns [`BackpressurePolicy::Reject`].
    fn default() -> Self {
        BackpressurePolicy::Reject
    }
}
