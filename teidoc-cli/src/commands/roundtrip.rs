//! Serialize a loaded document back to TEI.

use super::load_document;
use anyhow::{bail, Context, Result};
use std::path::Path;
use teidoc_core::{serialize_document, Passage, TeiDocument};

pub fn roundtrip(file: &Path, output: Option<&Path>, check: bool) -> Result<()> {
    let doc = load_document(file)?;
    let xml = serialize_document(&doc).context("Failed to serialize document")?;

    if check {
        let reloaded = TeiDocument::load(&xml).context("Serialized output does not reload")?;
        let mismatches = passage_mismatches(doc.state().passages.as_slice(), &reloaded.state().passages);
        if mismatches > 0 {
            bail!("{} passages changed after round trip", mismatches);
        }
        tracing::info!("Round trip preserved {} passages", doc.state().passages.len());
    }

    match output {
        Some(path) => {
            std::fs::write(path, &xml).with_context(|| format!("Failed to write {:?}", path))?;
            tracing::info!("Wrote {:?}", path);
        }
        None => print!("{}", xml),
    }

    Ok(())
}

/// Count passages that differ after reloading
fn passage_mismatches(before: &[Passage], after: &[Passage]) -> usize {
    if before.len() != after.len() {
        return before.len().max(after.len());
    }

    before.iter().zip(after).filter(|(a, b)| a != b).count()
}
