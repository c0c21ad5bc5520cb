//! Document events.
//!
//! Every state transition is recorded as an immutable event carrying
//! exactly the payload needed to regenerate it. Events serialize to JSON
//! with a `type` discriminator so a log can be persisted by the caller and
//! replayed later.

use crate::models::{Character, CharacterUpdate, Relationship, Tag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use teidoc_types::{CharacterId, PassageId, RelationshipId, Revision, TagId, TextRange};

/// One recorded state transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEvent {
    pub revision: Revision,
    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub kind: EventKind,
}

impl DocumentEvent {
    /// Create an event stamped with the current time
    pub fn new(revision: Revision, kind: EventKind) -> Self {
        Self::at(revision, Utc::now(), kind)
    }

    pub fn at(revision: Revision, timestamp: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            revision,
            timestamp,
            kind,
        }
    }
}

/// Payload of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventKind {
    /// Document loaded from markup; always the first event of a log
    Loaded { xml: Arc<str> },

    SaidTagAdded {
        passage_id: PassageId,
        tag_id: TagId,
        range: TextRange,
        speaker: Option<CharacterId>,
    },

    TagAdded { passage_id: PassageId, tag: Tag },

    TagRemoved { tag_id: TagId },

    CharacterAdded { character: Character },

    CharacterUpdated {
        character_id: CharacterId,
        updates: CharacterUpdate,
    },

    CharacterRemoved { character_id: CharacterId },

    RelationAdded { relationship: Relationship },

    RelationRemoved { relationship_id: RelationshipId },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Loaded { .. } => "loaded",
            EventKind::SaidTagAdded { .. } => "saidTagAdded",
            EventKind::TagAdded { .. } => "tagAdded",
            EventKind::TagRemoved { .. } => "tagRemoved",
            EventKind::CharacterAdded { .. } => "characterAdded",
            EventKind::CharacterUpdated { .. } => "characterUpdated",
            EventKind::CharacterRemoved { .. } => "characterRemoved",
            EventKind::RelationAdded { .. } => "relationAdded",
            EventKind::RelationRemoved { .. } => "relationRemoved",
        }
    }
}

/// Serialize an event log as a JSON array
pub fn events_to_json<E: Serialize>(events: &[E]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(events)
}

/// Parse an event log written by [`events_to_json`]
pub fn events_from_json(json: &str) -> serde_json::Result<Vec<DocumentEvent>> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = DocumentEvent::new(
            Revision(3),
            EventKind::TagRemoved {
                tag_id: TagId::new("tag-r2"),
            },
        );

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "tagRemoved");
        assert_eq!(value["revision"], 3);
        assert_eq!(value["tagId"], "tag-r2");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_event_log_json_round_trip() {
        let events = vec![
            DocumentEvent::new(
                Revision(0),
                EventKind::Loaded {
                    xml: Arc::from("<TEI/>"),
                },
            ),
            DocumentEvent::new(
                Revision(1),
                EventKind::SaidTagAdded {
                    passage_id: PassageId::new("passage-00000001"),
                    tag_id: TagId::new("tag-r1"),
                    range: TextRange::new(0, 4),
                    speaker: Some(CharacterId::from_xml_id("jane")),
                },
            ),
        ];

        let json = events_to_json(&events).unwrap();
        let parsed = events_from_json(&json).unwrap();
        assert_eq!(parsed, events);
        assert_eq!(parsed[1].kind.name(), "saidTagAdded");
    }
}
