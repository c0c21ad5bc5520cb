//! # Mutation operators
//!
//! Pure editing operations on [`TeiDocument`] values.
//!
//! Every operator:
//! - leaves its input document untouched and returns a new one,
//! - advances the revision by exactly one,
//! - appends exactly one event carrying that revision,
//! - fails atomically when the referenced passage, character or
//!   relationship does not exist.
//!
//! `remove_tag` is the exception: removing an unknown tag succeeds and is
//! still recorded as a revision.

use crate::apply::require_character;
use crate::document::TeiDocument;
use crate::error::Result;
use crate::event::EventKind;
use crate::identity::revision_tag_id;
use crate::models::{Character, CharacterUpdate, Relationship, Tag, TagType};
use std::collections::BTreeMap;
use teidoc_types::{CharacterId, PassageId, RelationshipId, TagId, TextRange};

/// Annotate `range` of a passage as direct speech, with a matching dialogue entry
pub fn add_said_tag(
    doc: &TeiDocument,
    passage_id: &PassageId,
    range: TextRange,
    speaker: Option<&CharacterId>,
) -> Result<TeiDocument> {
    doc.commit(EventKind::SaidTagAdded {
        passage_id: passage_id.clone(),
        tag_id: next_tag_id(doc)?,
        range,
        speaker: speaker.cloned(),
    })
}

/// Annotate `range` of a passage with an arbitrary tag
pub fn add_tag(
    doc: &TeiDocument,
    passage_id: &PassageId,
    range: TextRange,
    tag_name: &str,
    attributes: BTreeMap<String, String>,
) -> Result<TeiDocument> {
    let tag = Tag {
        id: next_tag_id(doc)?,
        tag_type: TagType::from_name(tag_name),
        range,
        attributes,
    };
    doc.commit(EventKind::TagAdded {
        passage_id: passage_id.clone(),
        tag,
    })
}

/// Tag a name mention pointing at an existing character (`ref="#xmlId"`)
pub fn add_pers_name_tag(
    doc: &TeiDocument,
    passage_id: &PassageId,
    range: TextRange,
    character_id: &CharacterId,
) -> Result<TeiDocument> {
    require_character(doc.state(), character_id)?;

    let mut attributes = BTreeMap::new();
    attributes.insert("ref".to_string(), format!("#{}", character_id.xml_id()));
    add_tag(doc, passage_id, range, TagType::PersName.as_str(), attributes)
}

/// Remove a tag (and its dialogue entry) wherever it occurs
pub fn remove_tag(doc: &TeiDocument, tag_id: &TagId) -> Result<TeiDocument> {
    doc.commit(EventKind::TagRemoved {
        tag_id: tag_id.clone(),
    })
}

pub fn add_character(doc: &TeiDocument, character: Character) -> Result<TeiDocument> {
    doc.commit(EventKind::CharacterAdded { character })
}

/// Merge `updates` into the character with `character_id`
pub fn update_character(
    doc: &TeiDocument,
    character_id: &CharacterId,
    updates: CharacterUpdate,
) -> Result<TeiDocument> {
    doc.commit(EventKind::CharacterUpdated {
        character_id: character_id.clone(),
        updates,
    })
}

pub fn remove_character(doc: &TeiDocument, character_id: &CharacterId) -> Result<TeiDocument> {
    doc.commit(EventKind::CharacterRemoved {
        character_id: character_id.clone(),
    })
}

pub fn add_relationship(doc: &TeiDocument, relationship: Relationship) -> Result<TeiDocument> {
    doc.commit(EventKind::RelationAdded { relationship })
}

pub fn remove_relationship(
    doc: &TeiDocument,
    relationship_id: &RelationshipId,
) -> Result<TeiDocument> {
    doc.commit(EventKind::RelationRemoved {
        relationship_id: relationship_id.clone(),
    })
}

fn next_tag_id(doc: &TeiDocument) -> Result<TagId> {
    doc.next_revision().map(revision_tag_id)
}
