//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(Arc<Message>) -> Fut`, producing a fresh
//! future per message. Shared state goes into the closure explicitly (`Arc<...>`).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use topicbus::{HandlerError, HandlerFn, HandlerRef, Message};
//!
//! let h: HandlerRef = HandlerFn::arc("printer", |msg: Arc<Message>| async move {
//!     println!("{}: {:?}", msg.seq, msg.text());
//!     Ok::<_, HandlerError>(())
//! });
//!
//! assert_eq!(h.name(), "printer");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::Handler;
use crate::error::HandlerError;
use crate::messages::Message;

/// Function-backed handler.
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    capacity: Option<usize>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`](super::HandlerRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            capacity: None,
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    /// Overrides the subscription queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Arc<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, msg: Arc<Message>) -> Result<(), HandlerError> {
        (self.f)(msg).await
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn queue_capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Payload;

    #[tokio::test]
    async fn calls_closure_with_message() {
        let h = HandlerFn::new("len", |msg: Arc<Message>| async move {
            if msg.payload.len() == 5 {
                Ok(())
            } else {
                Err(HandlerError::fail("wrong length"))
            }
        })
        .with_queue_capacity(3);

        let ok = Arc::new(Message::new(Arc::from("t"), 0, Payload::from("hello")));
        let bad = Arc::new(Message::new(Arc::from("t"), 1, Payload::from("hi")));
        assert!(h.handle(ok).await.is_ok());
        assert!(h.handle(bad).await.is_err());
        assert_eq!(h.name(), "len");
        assert_eq!(h.queue_capacity(), Some(3));
    }
}
