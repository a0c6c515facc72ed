//! Delivery policies.
//!
//! ## Contents
//! - [`BackpressurePolicy`] what a publish does when a subscriber queue is full
//!
//! ## Quick wiring
//! ```text
//! RegistryConfig { backpressure: BackpressurePolicy, queue_capacity, .. }
//!      └─► core::topic fan-out uses:
//!           - Block       → Slot::push_wait
//!           - DropOldest  → Slot::push_evict
//!           - Reject      → Slot::try_push
//! ```
//!
//! ## Defaults
//! - `BackpressurePolicy::Reject`: a full queue never stalls a publisher and never
//!   loses data silently.

mod backpressure;

pub use backpressure::BackpressurePolicy;
