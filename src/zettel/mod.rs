//! Zettel: identifiers, metadata and content

pub mod header;
pub mod id;
pub mod keys;
pub mod meta;

pub use id::Zid;
pub use meta::{Meta, MetaBuilder};

use std::borrow::Cow;

/// Content of a zettel, opaque to the store. Binary data is kept byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Content(Vec<u8>);

impl Content {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(data.into())
    }

    /// The content as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// The content as text, invalid sequences replaced.
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_binary(&self) -> bool {
        self.as_str().is_none()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl From<Vec<u8>> for Content {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl From<&[u8]> for Content {
    fn from(data: &[u8]) -> Self {
        Self::new(data)
    }
}

/// A zettel: metadata plus content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zettel {
    pub meta: Meta,
    pub content: Content,
}

impl Zettel {
    pub fn new(meta: Meta, content: impl Into<Content>) -> Self {
        Self {
            meta,
            content: content.into(),
        }
    }

    pub fn zid(&self) -> Zid {
        self.meta.zid()
    }

    /// The same zettel under another identifier.
    pub fn with_zid(&self, zid: Zid) -> Zettel {
        Zettel {
            meta: self.meta.with_zid(zid),
            content: self.content.clone(),
        }
    }
}
