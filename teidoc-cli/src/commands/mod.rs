//! CLI command implementations.

pub mod inspect;
pub mod replay;
pub mod roundtrip;
pub mod summary;
pub mod validate;

pub use inspect::inspect;
pub use replay::replay;
pub use roundtrip::roundtrip;
pub use validate::validate;

use anyhow::{Context, Result};
use std::path::Path;
use teidoc_core::{Config, TeiDocument};

/// Load the config file, falling back to defaults when it does not exist
pub(crate) fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!("No config at {:?}; using defaults", path);
        return Ok(Config::default());
    }
    Config::from_file(path).with_context(|| format!("Failed to load configuration {:?}", path))
}

pub(crate) fn load_document(path: &Path) -> Result<TeiDocument> {
    let xml = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    TeiDocument::load(&xml).with_context(|| format!("Failed to load TEI document {:?}", path))
}
