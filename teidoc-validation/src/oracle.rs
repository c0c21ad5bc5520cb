//! Validation oracles.
//!
//! An oracle turns a document state plus a schema location into a
//! [`ValidationResult`]. Schema validation itself lives outside this crate;
//! [`StructuralOracle`] only checks the document model's own consistency.

use crate::error::ValidationError;
use crate::result::{ValidationIssue, ValidationResult};
use std::collections::HashSet;
use std::path::Path;
use teidoc_core::builder::speaker_from_attributes;
use teidoc_core::{DocumentState, TagType};
use teidoc_types::CharacterId;

pub trait ValidationOracle: Send + Sync {
    fn validate(
        &self,
        state: &DocumentState,
        schema_path: &Path,
    ) -> Result<ValidationResult, ValidationError>;
}

/// Model-level consistency checks; ignores the schema path
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralOracle;

impl ValidationOracle for StructuralOracle {
    fn validate(
        &self,
        state: &DocumentState,
        _schema_path: &Path,
    ) -> Result<ValidationResult, ValidationError> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let mut seen = HashSet::new();
        for character in &state.characters {
            if !seen.insert(&character.id) {
                errors.push(ValidationIssue::new(
                    "character.duplicate_id",
                    format!("Character {} is declared more than once", character.id),
                ));
            }
        }

        for passage in &state.passages {
            if passage.content.trim().is_empty() {
                warnings.push(
                    ValidationIssue::new("passage.empty", "Passage has no text")
                        .in_passage(passage.id.clone()),
                );
            }

            for tag in &passage.tags {
                if let Err(err) = tag.range.validate_within(passage.char_len()) {
                    errors.push(
                        ValidationIssue::new(
                            "tag.bad_range",
                            format!("Tag {} has an invalid range: {}", tag.id, err),
                        )
                        .in_passage(passage.id.clone()),
                    );
                }

                let referenced = match tag.tag_type {
                    TagType::Said => speaker_from_attributes(&tag.attributes),
                    TagType::PersName => tag
                        .attributes
                        .get("ref")
                        .map(|r| CharacterId::from_xml_id(r.trim_start_matches('#'))),
                    _ => None,
                };
                if let Some(character) = referenced {
                    if state.character(&character).is_none() {
                        warnings.push(
                            ValidationIssue::new(
                                "tag.unknown_character",
                                format!("Tag {} points at unknown {}", tag.id, character),
                            )
                            .in_passage(passage.id.clone()),
                        );
                    }
                }
            }
        }

        for relationship in &state.relationships {
            for end in [&relationship.from, &relationship.to] {
                if state.character(end).is_none() {
                    warnings.push(ValidationIssue::new(
                        "relation.unknown_character",
                        format!("Relation {} points at unknown {}", relationship.id, end),
                    ));
                }
            }
        }

        tracing::debug!(
            "Structural validation at {}: {} errors, {} warnings",
            state.revision,
            errors.len(),
            warnings.len()
        );
        Ok(ValidationResult::from_issues(errors, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teidoc_core::TeiDocument;

    fn validate(xml: &str) -> ValidationResult {
        let doc = TeiDocument::load(xml).unwrap();
        StructuralOracle
            .validate(doc.state(), Path::new("tei_all.rng"))
            .unwrap()
    }

    #[test]
    fn test_clean_document_is_valid() {
        let result = validate(
            r##"<TEI><text><body><p><said who="#a">Hi</said></p></body></text>
<standOff><listPerson><person xml:id="a"><persName>A</persName></person></listPerson></standOff></TEI>"##,
        );
        assert!(result.valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_unknown_speaker_warns() {
        let result = validate(r##"<TEI><text><body><p><said who="#ghost">Boo</said></p></body></text></TEI>"##);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].code, "tag.unknown_character");
        assert!(result.warnings[0].passage_id.is_some());
    }

    #[test]
    fn test_duplicate_character_is_error() {
        let result = validate(
            r#"<TEI><text><body><p>x</p></body></text><standOff><listPerson>
<person xml:id="a"/><person xml:id="a"/></listPerson></standOff></TEI>"#,
        );
        assert!(!result.valid);
        assert_eq!(result.errors[0].code, "character.duplicate_id");
    }
}
