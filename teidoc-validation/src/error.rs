use teidoc_types::PassageId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache capacity must be at least 1")]
    ZeroCapacity,
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Unknown passage: {0}")]
    UnknownPassage(PassageId),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}
