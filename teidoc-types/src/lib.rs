//! Shared types for teidoc
//!
//! This crate provides the identifier, revision and range types used
//! across the teidoc crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Passage identifier, derived from passage content and position
    PassageId
);

string_id!(
    /// Tag identifier
    TagId
);

string_id!(
    /// Character identifier (`char-` followed by the person's `xml:id`)
    CharacterId
);

string_id!(
    /// Relationship identifier
    RelationshipId
);

/// Prefix that namespaces character identifiers derived from `xml:id`.
pub const CHARACTER_ID_PREFIX: &str = "char-";

impl CharacterId {
    /// Build a character identifier from a TEI `xml:id`
    pub fn from_xml_id(xml_id: &str) -> Self {
        Self(format!("{CHARACTER_ID_PREFIX}{xml_id}"))
    }

    /// The `xml:id` this identifier was derived from
    pub fn xml_id(&self) -> &str {
        self.0
            .strip_prefix(CHARACTER_ID_PREFIX)
            .unwrap_or(&self.0)
    }
}

/// Revision number of a document; one per applied event
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl Revision {
    pub const ZERO: Revision = Revision(0);

    /// The following revision, or `None` once the counter is exhausted
    pub fn checked_next(self) -> Option<Revision> {
        self.0.checked_add(1).map(Revision)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl From<u64> for Revision {
    fn from(rev: u64) -> Self {
        Revision(rev)
    }
}

/// Digest of the history that produced a document state
///
/// States derived from the same markup by the same events share a lineage.
/// Once an undo is followed by a new edit, a revision number can come back
/// with different content; its lineage will differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Lineage([u8; 32]);

impl Lineage {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Lineage(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|byte| write!(f, "{:02x}", byte))
    }
}

impl From<Lineage> for String {
    fn from(lineage: Lineage) -> Self {
        lineage.to_string()
    }
}

impl TryFrom<String> for Lineage {
    type Error = LineageError;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        if hex.len() != 64 || !hex.is_ascii() {
            return Err(LineageError(hex));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
                .map_err(|_| LineageError(hex.clone()))?;
        }
        Ok(Lineage(bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lineage must be 64 hex digits, got {0:?}")]
pub struct LineageError(pub String);

/// Errors produced when a range does not describe a span of a passage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("range end {end} is before start {start}")]
    Inverted { start: usize, end: usize },

    #[error("range end {end} exceeds text length {len}")]
    OutOfBounds { end: usize, len: usize },
}

/// Half-open character range `[start, end)` into a passage's flattened text
///
/// Offsets count Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        TextRange { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True when `other` lies entirely inside this range
    pub fn contains_range(&self, other: &TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check the range is well formed and fits a text of `len` characters
    pub fn validate_within(&self, len: usize) -> Result<(), RangeError> {
        if self.end < self.start {
            return Err(RangeError::Inverted {
                start: self.start,
                end: self.end,
            });
        }
        if self.end > len {
            return Err(RangeError::OutOfBounds { end: self.end, len });
        }
        Ok(())
    }

    /// Extract the characters covered by this range from `text`
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        let mut indices = text.char_indices().map(|(i, _)| i).chain([text.len()]);
        let start = indices.clone().nth(self.start).unwrap_or(text.len());
        let end = indices.nth(self.end).unwrap_or(text.len()).max(start);
        &text[start..end]
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
