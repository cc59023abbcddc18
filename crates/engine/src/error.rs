//! Engine Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Child-crate errors (scan, codec,
//! storage) are attached as sources so the full tree survives to the caller.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Commit attempted with nothing staged. Report and carry on.
    #[display("no files staged for commit")]
    EmptyStaging,
    /// The caller cancelled the operation. Already-written restore output is
    /// left in place; a cancelled commit leaves no commit record.
    #[display("operation cancelled")]
    Cancelled,
    /// No repository at the given working tree.
    #[display("no repository found at {}", _0.display())]
    NotInitialized(#[error(not(source))] PathBuf),
    /// A file could not be staged.
    #[display("cannot stage {}", _0.display())]
    Stage(#[error(not(source))] PathBuf),
    /// The staging index could not be read or written.
    #[display("staging index error")]
    Staging,
    /// The repository configuration could not be written.
    #[display("configuration error")]
    Config,
    /// Metadata scanning failed where no degraded fallback applies.
    #[display("file scan failed")]
    Scan,
    /// A codec operation failed.
    #[display("codec error")]
    Compression,
    /// A commit record, HEAD, or artifact lookup failed.
    #[display("storage error")]
    Storage,
    /// The commit pipeline failed; no commit record was created.
    #[display("commit failed")]
    Commit,
    /// The restore pipeline failed for the given version.
    #[display("restore of version {_0} failed")]
    Restore(#[error(not(source))] u64),
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
