//! Identifier generation.
//!
//! Passage identifiers are content-addressable: the same text at the same
//! position always yields the same ID across reloads. Tag identifiers are
//! derived from where the tag came from (its load position or the revision
//! that created it), so no process-wide counter is involved and replaying a
//! log reproduces every ID.
//!
//! A state's [`Lineage`] chains a BLAKE3 digest from the source markup
//! through each applied event. Timestamps are left out, so replaying a log
//! lands on the same lineage as the live edits that recorded it.

use crate::error::{DocumentError, Result};
use crate::event::DocumentEvent;
use teidoc_types::{Lineage, PassageId, RelationshipId, Revision, TagId};

/// Compute the stable identifier of a passage
///
/// Rules:
/// - 32-bit rolling hash (`h * 31 + unit`, wrapping) over the UTF-16 code
///   units of `content`
/// - the positional `index` is added to the hash
/// - formatted as `passage-` followed by 8 lowercase hex digits
///
/// # Examples
///
/// ```
/// use teidoc_core::identity::generate_passage_id;
///
/// let a = generate_passage_id("Hello", 0);
/// assert_eq!(a, generate_passage_id("Hello", 0));
/// assert_ne!(a, generate_passage_id("Hello", 1));
/// assert_eq!(a.as_str().len(), "passage-".len() + 8);
/// ```
pub fn generate_passage_id(content: &str, index: usize) -> PassageId {
    let hash = content
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    let mixed = hash.wrapping_add(index as i32);
    PassageId(format!("passage-{:08x}", mixed as u32))
}

/// Tag identifier for the `ordinal`-th tag found in passage `passage_index` at load
pub fn loaded_tag_id(passage_index: usize, ordinal: usize) -> TagId {
    TagId(format!("tag-{passage_index}-{ordinal}"))
}

/// Tag identifier for a tag created by the event at `revision`
pub fn revision_tag_id(revision: Revision) -> TagId {
    TagId(format!("tag-r{}", revision.as_u64()))
}

/// Relationship identifier for the `ordinal`-th relation without an `xml:id`
pub fn loaded_relationship_id(ordinal: usize) -> RelationshipId {
    RelationshipId(format!("relation-{ordinal}"))
}

/// Lineage of a document freshly loaded from `xml`
pub fn root_lineage(xml: &str) -> Lineage {
    Lineage::from_bytes(*blake3::hash(xml.as_bytes()).as_bytes())
}

/// Lineage of the state reached by applying `event` on top of `parent`
pub fn extend_lineage(parent: &Lineage, event: &DocumentEvent) -> Result<Lineage> {
    let kind = serde_json::to_vec(&event.kind).map_err(|e| {
        DocumentError::MalformedLog(format!(
            "cannot encode {} at {}: {}",
            event.kind.name(),
            event.revision,
            e
        ))
    })?;

    let mut hasher = blake3::Hasher::new();
    hasher.update(parent.as_bytes());
    hasher.update(&event.revision.as_u64().to_le_bytes());
    hasher.update(&kind);
    Ok(Lineage::from_bytes(*hasher.finalize().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use teidoc_types::CharacterId;

    #[test]
    fn test_passage_id_is_stable() {
        let first = generate_passage_id("It is a truth universally acknowledged", 3);
        let second = generate_passage_id("It is a truth universally acknowledged", 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_passage_id_depends_on_position() {
        let text = "\"Indeed,\" said he.";
        assert_ne!(generate_passage_id(text, 0), generate_passage_id(text, 1));
    }

    #[test]
    fn test_passage_id_known_values() {
        // h("a") = 97 = 0x61; h("ab") = 97 * 31 + 98 = 3105 = 0xc21
        assert_eq!(generate_passage_id("", 0).as_str(), "passage-00000000");
        assert_eq!(generate_passage_id("a", 0).as_str(), "passage-00000061");
        assert_eq!(generate_passage_id("ab", 2).as_str(), "passage-00000c23");
    }

    #[test]
    fn test_passage_id_wraps_on_long_content() {
        let long = "x".repeat(10_000);
        let id = generate_passage_id(&long, 0);
        assert!(id.as_str().starts_with("passage-"));
        assert_eq!(id.as_str().len(), 16);
    }

    #[test]
    fn test_tag_ids_are_positional() {
        assert_eq!(loaded_tag_id(2, 0).as_str(), "tag-2-0");
        assert_eq!(revision_tag_id(Revision(7)).as_str(), "tag-r7");
        assert_eq!(loaded_relationship_id(1).as_str(), "relation-1");
    }

    #[test]
    fn test_lineage_ignores_timestamps() {
        let root = root_lineage("<TEI/>");
        assert_eq!(root, root_lineage("<TEI/>"));
        assert_ne!(root, root_lineage("<TEI></TEI>"));

        let removal = || EventKind::CharacterRemoved {
            character_id: CharacterId::from_xml_id("anne"),
        };
        let early = DocumentEvent::at(Revision(1), chrono::Utc::now(), removal());
        let late = DocumentEvent::at(
            Revision(1),
            chrono::Utc::now() + chrono::Duration::hours(1),
            removal(),
        );
        assert_eq!(
            extend_lineage(&root, &early).unwrap(),
            extend_lineage(&root, &late).unwrap()
        );

        let renumbered = DocumentEvent::new(Revision(2), removal());
        assert_ne!(
            extend_lineage(&root, &early).unwrap(),
            extend_lineage(&root, &renumbered).unwrap()
        );
    }
}
