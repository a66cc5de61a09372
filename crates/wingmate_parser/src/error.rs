//! Parse error types.

use thiserror::Error;

use crate::SourceId;

/// Errors that can occur during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The source bytes are not valid for the expected encoding.
    #[error("Invalid source {identity}: {reason}")]
    InvalidSource {
        /// Record that failed to parse.
        identity: SourceId,
        /// Decoder message.
        reason: String,
        /// Byte offset where the error occurred, when known.
        offset: Option<usize>,
    },
}

impl ParseError {
    /// Creates a new invalid source error.
    pub fn invalid_source(identity: &SourceId, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            identity: identity.clone(),
            reason: reason.into(),
            offset: None,
        }
    }

    /// Creates a new invalid source error with offset.
    pub fn invalid_source_at(
        identity: &SourceId,
        reason: impl Into<String>,
        offset: usize,
    ) -> Self {
        Self::InvalidSource {
            identity: identity.clone(),
            reason: reason.into(),
            offset: Some(offset),
        }
    }

    /// Returns the identity of the record that failed.
    pub fn identity(&self) -> &SourceId {
        match self {
            Self::InvalidSource { identity, .. } => identity,
        }
    }

    /// Returns the failure reason without the identity prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::InvalidSource { reason, .. } => reason,
        }
    }
}
