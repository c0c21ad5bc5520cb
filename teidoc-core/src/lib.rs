//! # teidoc-core
//!
//! Event-sourced core for editing TEI documents.
//!
//! A loaded document is an immutable value: every edit returns a new
//! document with a higher revision and one more event in its log. The log
//! is enough to rebuild any earlier state, which is how undo, redo and
//! time travel work.

pub mod apply;
pub mod builder;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod history;
pub mod identity;
pub mod models;
pub mod operators;
pub mod serialize;

pub use builder::{build_state, load_document};
pub use codec::{XmlElement, XmlNode};
pub use config::{CacheConfig, Config, ConfigError};
pub use document::TeiDocument;
pub use error::{DocumentError, EntityKind, Result};
pub use event::{events_from_json, events_to_json, DocumentEvent, EventKind};
pub use history::{can_redo, can_undo, rebuild_state, redo, redo_from, time_travel, undo, undo_to};
pub use models::{
    Character, CharacterUpdate, Dialogue, DocumentMetadata, DocumentState, Passage, Relationship,
    Tag, TagType,
};
pub use serialize::{serialize_document, serialize_state};
pub use teidoc_types::{
    CharacterId, Lineage, PassageId, RelationshipId, Revision, TagId, TextRange,
};
