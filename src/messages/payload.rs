//! # Opaque message payload.
//!
//! [`Payload`] pairs reference-counted bytes with an optional type tag naming the
//! encoding (for example `"std_msgs/String"`). Cloning is cheap.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

/// Type tag stamped on payloads built from text.
pub const TEXT_TYPE: &str = "text/utf-8";

/// Opaque bytes plus an optional type tag.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    type_tag: Option<Arc<str>>,
    data: Bytes,
}

impl Payload {
    /// Untagged payload.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            type_tag: None,
            data: data.into(),
        }
    }

    /// Payload with a type tag.
    pub fn tagged(type_tag: impl Into<Arc<str>>, data: impl Into<Bytes>) -> Self {
        Self {
            type_tag: Some(type_tag.into()),
            data: data.into(),
        }
    }

    /// UTF-8 text tagged with [`TEXT_TYPE`].
    pub fn text(text: impl Into<String>) -> Self {
        Self::tagged(TEXT_TYPE, text.into())
    }

    /// Replaces the type tag.
    #[inline]
    pub fn with_type_tag(mut self, type_tag: impl Into<Arc<str>>) -> Self {
        self.type_tag = Some(type_tag.into());
        self
    }

    /// Type tag, if any.
    #[inline]
    pub fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }

    /// Raw bytes.
    #[inline]
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Payload as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("type_tag", &self.type_tag)
            .field("len", &self.data.len())
            .finish()
    }
}

impl From<&'static str> for Payload {
    fn from(s: &'static str) -> Self {
        Self::tagged(TEXT_TYPE, Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self {
        Self::new(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_tagged() {
        let p = Payload::from("hello");
        assert_eq!(p.type_tag(), Some(TEXT_TYPE));
        assert_eq!(p.as_str(), Some("hello"));
        assert_eq!(p.len(), 5);
    }

    #[test]
    fn raw_bytes_are_untagged() {
        let p = Payload::from(vec![0xff, 0xfe]);
        assert_eq!(p.type_tag(), None);
        assert_eq!(p.as_str(), None);
        let p = p.with_type_tag("blob");
        assert_eq!(p.type_tag(), Some("blob"));
    }
}
