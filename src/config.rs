//! # Registry configuration.
//!
//! Provides [`RegistryConfig`], the centralized settings of a
//! [`TopicRegistry`](crate::TopicRegistry).
//!
//! ## Sentinel values
//! - `recv_timeout = 0s` → `Subscriber::next()` waits forever
//! - `handler_timeout = 0s` → handler invocations are not timed out
//! - `queue_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::policies::BackpressurePolicy;

/// Configuration of a topic registry.
///
/// ## Field semantics
/// - `strict`: publishing to a topic that does not exist fails with `UnknownTopic`
/// - `queue_capacity`: default per-subscriber queue size
/// - `backpressure`: what a publish does when a subscriber queue is full
/// - `recv_timeout`: default `Subscriber::next()` timeout (`0s` = none)
/// - `handler_timeout`: per-message handler timeout (`0s` = none)
/// - `grace`: how long `shutdown()` waits for subscribers to drain
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Require topics to exist (registered or subscribed) before publishing.
    pub strict: bool,

    /// Default capacity of a subscriber queue.
    ///
    /// Used when neither the handler nor the `subscriber()` call names one.
    pub queue_capacity: usize,

    /// Behaviour of a publish when a subscriber queue is at capacity.
    pub backpressure: BackpressurePolicy,

    /// Default timeout of `Subscriber::next()`.
    pub recv_timeout: Duration,

    /// Maximum duration of a single handler invocation.
    ///
    /// A handler exceeding it is counted as a delivery failure.
    pub handler_timeout: Duration,

    /// Maximum time `shutdown()` waits for subscribers to drain before forcing them closed.
    pub grace: Duration,

    /// Capacity of the registry event bus.
    pub bus_capacity: usize,
}

impl RegistryConfig {
    /// Queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }

    /// Returns the default receive timeout as an `Option`.
    #[inline]
    pub fn default_recv_timeout(&self) -> Option<Duration> {
        if self.recv_timeout == Duration::ZERO {
            None
        } else {
            Some(self.recv_timeout)
        }
    }

    /// Returns the handler timeout as an `Option`.
    #[inline]
    pub fn handler_timeout(&self) -> Option<Duration> {
        if self.handler_timeout == Duration::ZERO {
            None
        } else {
            Some(self.handler_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for RegistryConfig {
    /// Default configuration:
    ///
    /// - `strict = false` (topics are created on first use)
    /// - `queue_capacity = 10`
    /// - `backpressure = BackpressurePolicy::Reject`
    /// - `recv_timeout = 0s` (wait forever)
    /// - `handler_timeout = 0s` (no timeout)
    /// - `grace = 5s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            strict: false,
            queue_capacity: 10,
            backpressure: BackpressurePolicy::default(),
            recv_timeout: Duration::ZERO,
            handler_timeout: Duration::ZERO,
            grace: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}
