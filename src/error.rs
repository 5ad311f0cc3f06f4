//! Error types.
//!
//! Comment injection itself never fails: providers omit what they cannot
//! produce and every value is representable after escaping. The errors here
//! cover misconfiguration, which is caught when a [`crate::SqlCommenter`] is
//! built, and decoding of comment blocks read back from logs.
//!
//! Errors returned by the wrapped connection are SeaORM's `DbErr` and are
//! passed through unchanged.

use thiserror::Error;

/// Errors raised while building a commenter or decoding a comment block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{provider} declares an empty comment key")]
    EmptyCommentKey { provider: &'static str },

    #[error("Malformed SQL comment: {0}")]
    MalformedComment(String),

    #[error("Invalid percent escape in {input:?}")]
    InvalidEscape { input: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
