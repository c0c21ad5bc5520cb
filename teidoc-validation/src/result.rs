//! Validation results and snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teidoc_core::DocumentState;
use teidoc_types::{Lineage, PassageId, Revision};

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Stable machine-readable code, e.g. `said.unknown_speaker`
    pub code: String,
    pub message: String,

    #[serde(default)]
    pub passage_id: Option<PassageId>,
}

impl ValidationIssue {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            passage_id: None,
        }
    }

    pub fn in_passage(mut self, passage_id: PassageId) -> Self {
        self.passage_id = Some(passage_id);
        self
    }
}

/// Output of a validation oracle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Build a result; `valid` is true when there are no errors
    pub fn from_issues(errors: Vec<ValidationIssue>, warnings: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Keep only the issues attributed to `passage_id`
    pub fn for_passage(&self, passage_id: &PassageId) -> Self {
        let keep = |issues: &[ValidationIssue]| -> Vec<ValidationIssue> {
            issues
                .iter()
                .filter(|issue| issue.passage_id.as_ref() == Some(passage_id))
                .cloned()
                .collect()
        };
        Self::from_issues(keep(&self.errors), keep(&self.warnings))
    }
}

/// A validation result tagged with the state it was computed against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSnapshot {
    pub result: ValidationResult,
    pub revision: Revision,
    pub lineage: Lineage,
    pub validated_at: DateTime<Utc>,
}

impl ValidationSnapshot {
    /// Record `result` as computed against `state`
    pub fn new(result: ValidationResult, state: &DocumentState) -> Self {
        Self {
            result,
            revision: state.revision,
            lineage: state.lineage,
            validated_at: Utc::now(),
        }
    }

    /// Stale once the document has moved to another revision, or to the
    /// same revision number on a different branch of its history
    pub fn is_stale(&self, state: &DocumentState) -> bool {
        self.revision != state.revision || self.lineage != state.lineage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teidoc_core::operators::add_tag;
    use teidoc_core::{undo_to, TeiDocument, TextRange};

    #[test]
    fn test_snapshot_staleness_follows_revision() {
        let doc = TeiDocument::load("<TEI><text><body><p>Hello</p></body></text></TEI>").unwrap();
        let snapshot = ValidationSnapshot::new(ValidationResult::default(), doc.state());
        assert!(!snapshot.is_stale(doc.state()));

        let passage = doc.state().passages[0].id.clone();
        let edited = add_tag(&doc, &passage, TextRange::new(0, 5), "q", Default::default()).unwrap();
        assert!(snapshot.is_stale(edited.state()));
    }

    #[test]
    fn test_snapshot_from_undone_branch_is_stale() {
        let doc = TeiDocument::load("<TEI><text><body><p>Hello</p></body></text></TEI>").unwrap();
        let passage = doc.state().passages[0].id.clone();

        let quoted = add_tag(&doc, &passage, TextRange::new(0, 5), "q", Default::default()).unwrap();
        let snapshot = ValidationSnapshot::new(ValidationResult::default(), quoted.state());

        let rewound = undo_to(&quoted, Revision::ZERO).unwrap();
        let named = add_tag(&rewound, &passage, TextRange::new(0, 5), "rs", Default::default())
            .unwrap();
        assert_eq!(named.revision(), snapshot.revision);
        assert!(snapshot.is_stale(named.state()));
    }

    #[test]
    fn test_for_passage_narrows_issues() {
        let a = PassageId::new("passage-a");
        let b = PassageId::new("passage-b");
        let result = ValidationResult::from_issues(
            vec![ValidationIssue::new("x", "bad").in_passage(a.clone())],
            vec![ValidationIssue::new("y", "meh").in_passage(b.clone())],
        );
        assert!(!result.valid);

        let only_b = result.for_passage(&b);
        assert!(only_b.valid);
        assert_eq!(only_b.warnings.len(), 1);
        assert!(result.for_passage(&a).warnings.is_empty());
    }

    #[test]
    fn test_result_json_shape() {
        let result = ValidationResult::from_issues(Vec::new(), Vec::new());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["valid"], true);
        assert!(value["errors"].as_array().unwrap().is_empty());
    }
}
