//! Rebuild a document from a persisted event log.

use super::summary::DocumentSummary;
use anyhow::{Context, Result};
use std::path::Path;
use teidoc_core::{events_from_json, time_travel, TeiDocument};

pub fn replay(events_path: &Path, revision: Option<u64>, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(events_path)
        .with_context(|| format!("Failed to read {:?}", events_path))?;
    let events = events_from_json(&raw).context("Failed to parse event log")?;

    let mut doc = TeiDocument::from_events(events).context("Failed to replay event log")?;
    if let Some(revision) = revision {
        let position = doc
            .events()
            .iter()
            .position(|e| e.revision.as_u64() == revision)
            .with_context(|| format!("Revision {} is not in the log", revision))?;
        doc = time_travel(&doc, position)
            .with_context(|| format!("Failed to travel to revision {}", revision))?;
    }

    let summary = DocumentSummary::of(&doc);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print();
    }

    Ok(())
}
