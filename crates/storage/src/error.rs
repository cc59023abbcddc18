//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No commit record exists for the requested version.
    #[display("no commit record for version {_0}")]
    VersionNotFound(#[error(not(source))] u64),
    /// No commit matches the given reference (hash prefix or version tag).
    #[display("no commit matches reference {_0:?}")]
    ReferenceNotFound(#[error(not(source))] String),
    /// A hash prefix matched more than one commit; the caller should ask for
    /// a longer prefix.
    #[display("reference {_0:?} is ambiguous")]
    AmbiguousReference(#[error(not(source))] String),
    /// A commit record exists but no artifact for it is reachable.
    #[display("no artifact reachable for version {_0}")]
    ArtifactNotFound(#[error(not(source))] u64),
    /// A commit record names a strategy the codec set cannot decode.
    #[display("unknown compression strategy: {_0}")]
    UnknownStrategy(#[error(not(source))] String),
    /// A commit record or HEAD file failed to parse.
    #[display("corrupt repository file: {}", _0.display())]
    CorruptRecord(#[error(not(source))] PathBuf),
    /// Underlying I/O error.
    #[display("I/O error: {_0}")]
    Io(IoError),
}

impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
