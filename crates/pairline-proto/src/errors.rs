//! Codec error types.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors produced while decoding a wire line.
///
/// Decoding errors are local to the offending line. The caller discards the
/// line and keeps the connection open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// `KEY` record without exactly two integer fields
    #[error("malformed key announcement: {reason}")]
    MalformedKey {
        /// What was wrong with the record
        reason: String,
    },

    /// `MSG` record with a field that is not an integer
    #[error("malformed message: {reason}")]
    MalformedMessage {
        /// What was wrong with the record
        reason: String,
    },
}

impl CodecError {
    pub(crate) fn key(reason: impl Into<String>) -> Self {
        Self::MalformedKey { reason: reason.into() }
    }

    pub(crate) fn message(reason: impl Into<String>) -> Self {
        Self::MalformedMessage { reason: reason.into() }
    }
}
