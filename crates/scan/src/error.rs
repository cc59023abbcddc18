//! Scan Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A scan error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The file is not a Photoshop document (bad signature).
    #[display("not a PSD document: signature {_0:02x?}")]
    NotPsd(#[error(not(source))] [u8; 4]),
    /// The document declares a version the parser does not understand.
    #[display("unsupported PSD version: {_0}")]
    UnsupportedVersion(#[error(not(source))] u16),
    /// A section or record ended before its declared length.
    #[display("truncated PSD document while reading {_0}")]
    Truncated(#[error(not(source))] &'static str),
    /// A structure inside the document did not match the format.
    #[display("malformed PSD structure: {_0}")]
    Malformed(#[error(not(source))] &'static str),
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
