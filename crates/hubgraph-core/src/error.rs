//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while decoding upstream metadata.
///
/// None of these are fatal: callers log them and fall back to the last
/// known value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Malformed header {name}: {value:?}")]
    MalformedHeader { name: String, value: String },

    #[error("Cannot parse timestamp {value:?}: {reason}")]
    TimestampParse { value: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
