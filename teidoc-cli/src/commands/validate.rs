//! Validate a document passage by passage.

use super::{load_config, load_document};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use teidoc_validation::{
    CachedValidator, StructuralOracle, ValidationCache, ValidationIssue, ValidationSnapshot,
};

#[derive(Serialize)]
struct ValidationReport {
    valid: bool,
    revision: u64,
    passages: Vec<ValidationSnapshot>,
    document: Vec<ValidationIssue>,
}

pub fn validate(config_path: &Path, file: &Path, schema: &Path, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let doc = load_document(file)?;
    let state = doc.state();

    let cache = ValidationCache::from_config(&config.cache).context("Invalid cache settings")?;
    let validator = CachedValidator::new(StructuralOracle, schema, cache);

    // One oracle run; the per-passage lookups below are served from the cache
    let whole = validator.validate_document(state)?;
    let passages = state
        .passages
        .iter()
        .map(|passage| validator.validate_passage(state, &passage.id))
        .collect::<Result<Vec<_>, _>>()?;

    // Issues not tied to any passage (relations, duplicate characters)
    let document: Vec<ValidationIssue> = whole
        .result
        .errors
        .iter()
        .chain(&whole.result.warnings)
        .filter(|issue| issue.passage_id.is_none())
        .cloned()
        .collect();

    let report = ValidationReport {
        valid: whole.result.valid,
        revision: doc.revision().as_u64(),
        passages,
        document,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let issues = report
            .passages
            .iter()
            .flat_map(|s| s.result.errors.iter().chain(&s.result.warnings))
            .chain(&report.document);
        for issue in issues {
            let passage = issue
                .passage_id
                .as_ref()
                .map(|p| format!(" [{}]", p))
                .unwrap_or_default();
            println!("- {}{}: {}", issue.code, passage, issue.message);
        }
        println!(
            "Validation complete: {} passages, {}",
            report.passages.len(),
            if report.valid { "valid" } else { "invalid" }
        );
        tracing::debug!("{}", validator.stats());
    }

    if !report.valid {
        bail!("Document failed validation");
    }
    Ok(())
}
