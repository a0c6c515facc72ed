//! # Payload schemas.
//!
//! A [`Schema`] names the expected type tag of a topic's payloads and can carry a
//! validator over the raw bytes. [`Publisher::send`](crate::Publisher::send)
//! checks every payload against its schema before fan-out:
//!
//! ```text
//! payload.type_tag == None            → stamped with schema tag, then validated
//! payload.type_tag == schema tag      → validated
//! payload.type_tag != schema tag      → SerializationError
//! validator(bytes) == Err(reason)     → SerializationError
//! ```
//!
//! ## Example
//! ```rust
//! use topicbus::{Payload, Schema};
//!
//! let schema = Schema::utf8("std_msgs/String");
//! assert!(schema.validate(Payload::new(&b"hi"[..])).is_ok());
//! assert!(schema.validate(Payload::new(vec![0xff])).is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::PubSubError;

use super::Payload;

type Validator = Arc<dyn Fn(&[u8]) -> Result<(), String> + Send + Sync>;

/// Expected type tag plus an optional byte validator.
#[derive(Clone)]
pub struct Schema {
    type_tag: Arc<str>,
    validator: Option<Validator>,
}

impl Schema {
    /// Schema that only checks the type tag.
    pub fn new(type_tag: impl Into<Arc<str>>) -> Self {
        Self {
            type_tag: type_tag.into(),
            validator: None,
        }
    }

    /// Schema accepting UTF-8 text only.
    pub fn utf8(type_tag: impl Into<Arc<str>>) -> Self {
        Self::new(type_tag).with_validator(|bytes| {
            std::str::from_utf8(bytes)
                .map(|_| ())
                .map_err(|e| format!("invalid utf-8: {e}"))
        })
    }

    /// Attaches a validator run over the payload bytes.
    pub fn with_validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    #[inline]
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Checks `payload`, returning it stamped with the schema tag.
    pub fn validate(&self, payload: Payload) -> Result<Payload, PubSubError> {
        let payload = match payload.type_tag() {
            None => payload.with_type_tag(Arc::clone(&self.type_tag)),
            Some(tag) if tag == &*self.type_tag => payload,
            Some(tag) => {
                return Err(self.reject(format!("type tag '{tag}' does not match")));
            }
        };

        if let Some(validator) = &self.validator {
            validator(payload.bytes()).map_err(|reason| self.reject(reason))?;
        }
        Ok(payload)
    }

    fn reject(&self, reason: String) -> PubSubError {
        PubSubError::SerializationError {
            schema: Arc::clone(&self.type_tag),
            reason,
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_tag", &self.type_tag)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}
