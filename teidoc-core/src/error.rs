//! Error types for the document core

use crate::codec::CodecError;
use teidoc_types::{RangeError, Revision};
use thiserror::Error;

/// What kind of entity a lookup failed to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Passage,
    Character,
    Relationship,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Passage => f.write_str("passage"),
            EntityKind::Character => f.write_str("character"),
            EntityKind::Relationship => f.write_str("relationship"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Invalid range: {0}")]
    InvalidRange(#[from] RangeError),

    #[error("Invalid history target {target}: {reason}")]
    InvalidHistoryTarget { target: Revision, reason: String },

    #[error("Malformed event log: {0}")]
    MalformedLog(String),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl DocumentError {
    pub(crate) fn not_found(kind: EntityKind, id: impl std::fmt::Display) -> Self {
        DocumentError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type Result<T, E = DocumentError> = std::result::Result<T, E>;
