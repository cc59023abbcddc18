//! Codec Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A codec error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Failed to initialize an encoder/decoder.
    Encoder,
    /// An artifact is missing, truncated, or fails envelope validation.
    /// Don't retry with the same input.
    #[display("corrupt artifact: {_0}")]
    CorruptArtifact(#[error(not(source))] String),
    /// The encoded output was larger than the configured ratio allows. The
    /// artifact has already been deleted; the caller decides the fallback.
    #[display("ineffective compression: ratio {ratio:.3} exceeds limit {limit:.3}")]
    IneffectiveCompression {
        ratio: f64,
        limit: f64,
    },
    /// The strategy tag is not part of the codec set.
    #[display("unsupported strategy: {_0}")]
    UnsupportedStrategy(#[error(not(source))] String),
    /// The strategy is recognised but cannot perform the requested operation
    /// (e.g. streaming reads from a bsdiff patch).
    #[display("strategy {_0} cannot be read as a stream")]
    NotStreamable(#[error(not(source))] &'static str),
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
