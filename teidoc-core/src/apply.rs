//! Deterministic application of one event to a state.
//!
//! This is the only place structural edits happen. Live operators build an
//! event and call [`apply`]; replay folds [`apply`] over a log. Sharing one
//! code path keeps replay equivalent to live editing.

use crate::builder::dialogue_entry;
use crate::error::{DocumentError, EntityKind, Result};
use crate::event::{DocumentEvent, EventKind};
use crate::identity::extend_lineage;
use crate::models::{DocumentState, Tag, TagType};
use std::collections::BTreeMap;
use teidoc_types::{CharacterId, PassageId, TagId};

/// Apply `event` to `state`, returning the next state
///
/// `state` is never modified; on error nothing is produced. A `loaded`
/// event is rejected here because it can only start a log.
pub fn apply(state: &DocumentState, event: &DocumentEvent) -> Result<DocumentState> {
    let mut next = state.clone();

    match &event.kind {
        EventKind::Loaded { .. } => {
            return Err(DocumentError::MalformedLog(format!(
                "loaded event at {} can only start a log",
                event.revision
            )));
        }
        EventKind::SaidTagAdded {
            passage_id,
            tag_id,
            range,
            speaker,
        } => {
            let mut attributes = BTreeMap::new();
            if let Some(speaker) = speaker {
                attributes.insert("who".to_string(), format!("#{}", speaker.xml_id()));
            }
            let tag = Tag {
                id: tag_id.clone(),
                tag_type: TagType::Said,
                range: *range,
                attributes,
            };
            insert_tag(&mut next, passage_id, tag, speaker.clone())?;
        }
        EventKind::TagAdded { passage_id, tag } => {
            let speaker = crate::builder::speaker_from_attributes(&tag.attributes);
            insert_tag(&mut next, passage_id, tag.clone(), speaker)?;
        }
        EventKind::TagRemoved { tag_id } => remove_tag(&mut next, tag_id),
        EventKind::CharacterAdded { character } => next.characters.push(character.clone()),
        EventKind::CharacterUpdated {
            character_id,
            updates,
        } => {
            let slot = next
                .characters
                .iter_mut()
                .find(|c| &c.id == character_id)
                .ok_or_else(|| DocumentError::not_found(EntityKind::Character, character_id))?;
            *slot = updates.merge_into(slot);
        }
        EventKind::CharacterRemoved { character_id } => {
            require_character(&next, character_id)?;
            next.characters.retain(|c| &c.id != character_id);
        }
        EventKind::RelationAdded { relationship } => {
            next.relationships.push(relationship.clone())
        }
        EventKind::RelationRemoved { relationship_id } => {
            if next.relationship(relationship_id).is_none() {
                return Err(DocumentError::not_found(
                    EntityKind::Relationship,
                    relationship_id,
                ));
            }
            next.relationships.retain(|r| &r.id != relationship_id);
        }
    }

    next.lineage = extend_lineage(&state.lineage, event)?;
    next.revision = event.revision;
    Ok(next)
}

pub(crate) fn require_character(state: &DocumentState, id: &CharacterId) -> Result<()> {
    state
        .character(id)
        .map(|_| ())
        .ok_or_else(|| DocumentError::not_found(EntityKind::Character, id))
}

/// Append a tag to its passage; said tags also get a dialogue entry
fn insert_tag(
    state: &mut DocumentState,
    passage_id: &PassageId,
    tag: Tag,
    speaker: Option<CharacterId>,
) -> Result<()> {
    let passage = state
        .passages
        .iter_mut()
        .find(|p| &p.id == passage_id)
        .ok_or_else(|| DocumentError::not_found(EntityKind::Passage, passage_id))?;

    tag.range.validate_within(passage.char_len())?;

    if tag.tag_type == TagType::Said {
        state.dialogue.push(dialogue_entry(passage, &tag, speaker));
    }
    passage.tags.push(tag);
    Ok(())
}

/// Drop every tag and dialogue entry with `tag_id`, in all passages
fn remove_tag(state: &mut DocumentState, tag_id: &TagId) {
    let before = state.tag_count();
    for passage in &mut state.passages {
        passage.tags.retain(|t| &t.id != tag_id);
    }
    state.dialogue.retain(|d| &d.id != tag_id);

    if state.tag_count() == before {
        tracing::debug!("Tag {} not found; removal recorded as a no-op", tag_id);
    }
}
