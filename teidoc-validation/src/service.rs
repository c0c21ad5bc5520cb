//! Cached passage validation.

use crate::cache::{CacheKey, CacheStats, ValidationCache};
use crate::error::ValidationError;
use crate::oracle::ValidationOracle;
use crate::result::{ValidationResult, ValidationSnapshot};
use std::path::{Path, PathBuf};
use teidoc_core::DocumentState;
use teidoc_types::PassageId;

/// Validates passages through an oracle, memoizing per `(passage, revision)`
///
/// Entries also remember the lineage of the state they were computed
/// against, so a revision number reused after undo never serves a result
/// from the abandoned branch.
pub struct CachedValidator<O> {
    oracle: O,
    schema_path: PathBuf,
    cache: ValidationCache<ValidationSnapshot>,
}

impl<O: ValidationOracle> CachedValidator<O> {
    pub fn new(
        oracle: O,
        schema_path: impl Into<PathBuf>,
        cache: ValidationCache<ValidationSnapshot>,
    ) -> Self {
        Self {
            oracle,
            schema_path: schema_path.into(),
            cache,
        }
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    pub fn cache(&self) -> &ValidationCache<ValidationSnapshot> {
        &self.cache
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Validate one passage of `state`
    ///
    /// A cached snapshot is only returned when its revision and lineage
    /// still match the state; anything else goes back to the oracle and
    /// replaces the cached entry.
    pub fn validate_passage(
        &self,
        state: &DocumentState,
        passage_id: &PassageId,
    ) -> Result<ValidationSnapshot, ValidationError> {
        if state.passage(passage_id).is_none() {
            return Err(ValidationError::UnknownPassage(passage_id.clone()));
        }

        let key = CacheKey::new(passage_id.clone(), state.revision);
        if let Some(snapshot) = self.cache.get(&key) {
            if !snapshot.is_stale(state) {
                return Ok(snapshot);
            }
            tracing::warn!("Discarding stale snapshot for {}", key);
        }

        let result = self.oracle.validate(state, &self.schema_path)?;
        let snapshot = ValidationSnapshot::new(result.for_passage(passage_id), state);
        self.cache.set(key, snapshot.clone());
        Ok(snapshot)
    }

    /// Validate the whole document with a single oracle run
    ///
    /// The per-passage slices of the result are stored in the cache, so
    /// `validate_passage` calls on the same state afterwards are hits.
    pub fn validate_document(
        &self,
        state: &DocumentState,
    ) -> Result<ValidationSnapshot, ValidationError> {
        let result: ValidationResult = self.oracle.validate(state, &self.schema_path)?;
        for passage in &state.passages {
            let key = CacheKey::new(passage.id.clone(), state.revision);
            self.cache
                .set(key, ValidationSnapshot::new(result.for_passage(&passage.id), state));
        }
        Ok(ValidationSnapshot::new(result, state))
    }
}
