//! # teidoc-validation
//!
//! Caching layer around document validation. Results are keyed by passage
//! and revision; a cached result is only trusted while the document is
//! still at the revision it was computed against.

pub mod cache;
pub mod clock;
pub mod error;
pub mod oracle;
pub mod result;
pub mod service;

pub use cache::{CacheKey, CacheStats, ValidationCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, ValidationError};
pub use oracle::{StructuralOracle, ValidationOracle};
pub use result::{ValidationIssue, ValidationResult, ValidationSnapshot};
pub use service::CachedValidator;
