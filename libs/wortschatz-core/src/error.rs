//! Error types for wortschatz-core.

use thiserror::Error;

/// Result type alias using VocabError.
pub type Result<T> = std::result::Result<T, VocabError>;

/// Errors raised by the pure progress rules.
///
/// These indicate a caller bug and are never produced by storage or sync.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabError {
    #[error("invalid grade '{0}': expected again, hard or good")]
    InvalidGrade(String),

    #[error("invalid star count {0}: expected 0 to 3")]
    InvalidStarCount(u8),
}
