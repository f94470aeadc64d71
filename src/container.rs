//! Container Model
//!
//! The values stored in an assortment: a term hash plus the ordered document
//! references that point at that term.

use std::fmt;

use crate::error::{AssortError, Result};
use crate::layout::{ATTRIBUTES_LEN, DOC_HASH_LEN, TERM_HASH_LEN};

/// Defines a fixed-length hash newtype with byte and string constructors
macro_rules! fixed_hash {
    ($(#[$meta:meta])* $name:ident, $len:expr, $what:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Hash length in bytes
            pub const LEN: usize = $len;

            /// Build from a slice of exactly `LEN` bytes
            pub fn from_slice(bytes: &[u8]) -> Result<Self> {
                let arr: [u8; $len] = bytes.try_into().map_err(|_| {
                    AssortError::Config(format!(
                        concat!($what, " must be {} bytes, got {}"),
                        $len,
                        bytes.len()
                    ))
                })?;
                Ok(Self(arr))
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = AssortError;

            fn try_from(s: &str) -> Result<Self> {
                Self::from_slice(s.as_bytes())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", String::from_utf8_lossy(&self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self)
            }
        }
    };
}

fixed_hash!(
    /// Content-derived key of an indexed word
    TermHash,
    TERM_HASH_LEN,
    "term hash"
);

fixed_hash!(
    /// Hash identifying a document that cites a term
    DocHash,
    DOC_HASH_LEN,
    "document hash"
);

/// One document citing a term, with its encoded attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocRef {
    doc_hash: DocHash,
    attributes: Vec<u8>,
}

impl DocRef {
    /// Create a reference
    ///
    /// Attributes are stored NUL-padded, so they may not exceed
    /// [`ATTRIBUTES_LEN`] bytes and may not end with a NUL byte.
    pub fn new(doc_hash: DocHash, attributes: impl Into<Vec<u8>>) -> Result<Self> {
        let attributes = attributes.into();
        if attributes.len() > ATTRIBUTES_LEN {
            return Err(AssortError::Config(format!(
                "attributes of {} exceed {} bytes",
                doc_hash, ATTRIBUTES_LEN
            )));
        }
        if attributes.last() == Some(&0) {
            return Err(AssortError::Config(format!(
                "attributes of {} end with a NUL byte",
                doc_hash
            )));
        }
        Ok(Self {
            doc_hash,
            attributes,
        })
    }

    pub fn doc_hash(&self) -> &DocHash {
        &self.doc_hash
    }

    pub fn attributes(&self) -> &[u8] {
        &self.attributes
    }
}

/// A term together with the ordered references that cite it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    term_hash: TermHash,
    /// Last update time (unix millis)
    updated: i64,
    refs: Vec<DocRef>,
}

impl Container {
    pub fn new(term_hash: TermHash, updated: i64, refs: Vec<DocRef>) -> Self {
        Self {
            term_hash,
            updated,
            refs,
        }
    }

    pub fn term_hash(&self) -> &TermHash {
        &self.term_hash
    }

    pub fn updated(&self) -> i64 {
        self.updated
    }

    /// Number of references
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// References in stored order
    pub fn iter(&self) -> std::slice::Iter<'_, DocRef> {
        self.refs.iter()
    }

    pub fn into_refs(self) -> Vec<DocRef> {
        self.refs
    }
}

impl<'a> IntoIterator for &'a Container {
    type Item = &'a DocRef;
    type IntoIter = std::slice::Iter<'a, DocRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.refs.iter()
    }
}
