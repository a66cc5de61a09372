//! Error types for loading and resolution.

use std::io;

use thiserror::Error;
use wingmate_parser::{ParseError, SourceId};

/// Why a single record could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadErrorKind {
    /// The record does not exist.
    #[error("not found")]
    NotFound,

    /// The record exists but cannot be read.
    #[error("permission denied")]
    PermissionDenied,

    /// The record exceeds the configured size limit.
    #[error("size {size} exceeds limit of {limit} bytes")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// The identity names something other than a regular file.
    #[error("not a regular file")]
    NotAFile,

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// The bytes were read but could not be parsed.
    #[error("{0}")]
    Parse(ParseError),
}

/// A record that failed to load. Recoverable per identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to load {identity}: {kind}")]
pub struct LoadError {
    /// Record that failed.
    pub identity: SourceId,
    /// Failure reason.
    pub kind: LoadErrorKind,
}

impl LoadError {
    /// Creates a load error.
    pub fn new(identity: &SourceId, kind: LoadErrorKind) -> Self {
        Self {
            identity: identity.clone(),
            kind,
        }
    }

    /// Creates a not-found error.
    pub fn not_found(identity: &SourceId) -> Self {
        Self::new(identity, LoadErrorKind::NotFound)
    }

    /// Maps an I/O error onto the matching kind.
    pub fn io(identity: &SourceId, err: &io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => LoadErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => LoadErrorKind::PermissionDenied,
            _ => LoadErrorKind::Io(err.to_string()),
        };
        Self::new(identity, kind)
    }

    /// Wraps a parse failure.
    pub fn parse(err: ParseError) -> Self {
        Self {
            identity: err.identity().clone(),
            kind: LoadErrorKind::Parse(err),
        }
    }

    /// Returns true if the record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, LoadErrorKind::NotFound)
    }

    /// Returns true if the record was read but could not be parsed.
    pub fn is_parse(&self) -> bool {
        matches!(self.kind, LoadErrorKind::Parse(_))
    }
}

/// An entity that resolved with one or more of its sources missing.
///
/// Carried inside the resolved value rather than returned as an `Err`, so a
/// batch never loses an entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Partial resolution for {entity}: {} source(s) unavailable", missing_sources.len())]
pub struct PartialResolution {
    /// Entity that could not be fully resolved.
    pub entity: String,
    /// Sources it referenced that failed to load.
    pub missing_sources: Vec<SourceId>,
}

/// A batch load stopped early by its cancellation token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Batch cancelled after {completed} of {requested} sources")]
pub struct CancellationError {
    /// Unique sources in the batch.
    pub requested: usize,
    /// Sources that finished (loaded or failed) before cancellation.
    pub completed: usize,
    /// Sources never started.
    pub skipped: Vec<SourceId>,
}

/// Errors surfaced by the repository and services.
///
/// Per-record and per-entity failures are not in here: they stay inside the
/// batch results. These are caller-level failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller broke the repository contract.
    #[error("Contract violation: {0}")]
    Contract(String),
}

impl CoreError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a contract violation.
    pub fn contract(message: impl Into<String>) -> Self {
        Self::Contract(message.into())
    }
}
