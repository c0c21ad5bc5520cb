//! Summarise a TEI document.

use super::summary::DocumentSummary;
use super::{load_config, load_document};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use teidoc_core::CacheConfig;

#[derive(Serialize)]
struct InspectReport<'a> {
    #[serde(flatten)]
    summary: DocumentSummary,
    validation_cache: &'a CacheConfig,
}

pub fn inspect(config_path: &Path, file: &Path, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let doc = load_document(file)?;
    let summary = DocumentSummary::of(&doc);

    if json {
        let report = InspectReport {
            summary,
            validation_cache: &config.cache,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        summary.print();
        for character in &doc.state().characters {
            println!("  - {} ({})", character.name, character.xml_id);
        }
    }

    Ok(())
}
