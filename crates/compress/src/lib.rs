//! Artifact codecs for DGit.
//!
//! Every stored revision is one of a closed family of artifact encodings,
//! named by [`Strategy`]:
//!
//! - [`Lz4`](Strategy::Lz4) — a self-contained snapshot: all staged files
//!   framed into a single LZ4 [container](container).
//! - [`PsdSmart`](Strategy::PsdSmart) — a [smart delta](smart) for Photoshop
//!   documents: a JSON layer-change manifest plus an LZ4-compressed copy of
//!   the new file.
//! - [`Bsdiff`](Strategy::Bsdiff) — a [binary patch](patch) against an
//!   earlier container's record stream.
//! - [`Zstd`](Strategy::Zstd) — a background re-encode of an LZ4 snapshot
//!   ([transcode]); decodes identically.
//! - [`Zip`](Strategy::Zip) — legacy read-only snapshots from older
//!   repositories.
//!
//! The family is deliberately a sum type rather than open dispatch: callers
//! pattern-match, and an unknown tag in a commit record is surfaced as an
//! error instead of silently skipped.

pub mod container;
mod construct;
pub mod error;
pub mod patch;
pub mod smart;
pub mod transcode;

pub use crate::container::{PackEntry, PackStats, UnpackSummary};
pub use crate::smart::SmartDeltaManifest;

/// A supported artifact encoding strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Strategy {
    /// LZ4-compressed container snapshot (primary format).
    #[default]
    #[serde(rename = "lz4")]
    Lz4,
    /// PSD layer-aware smart delta.
    #[serde(rename = "psd_smart")]
    PsdSmart,
    /// bsdiff binary patch against a base version.
    #[serde(rename = "bsdiff")]
    Bsdiff,
    /// Legacy ZIP snapshot (read-only).
    #[serde(rename = "zip")]
    Zip,
    /// Background-optimized Zstd re-encode of an LZ4 snapshot.
    #[serde(rename = "zstd")]
    Zstd,
}

impl Strategy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lz4 => "lz4",
            Self::PsdSmart => "psd_smart",
            Self::Bsdiff => "bsdiff",
            Self::Zip => "zip",
            Self::Zstd => "zstd",
        }
    }

    /// Whether decoding this artifact requires an earlier version.
    ///
    /// Note that a smart delta is *encoded* against a base but carries a
    /// self-contained payload; it still counts as a delta for chain-length
    /// accounting.
    #[must_use]
    pub fn is_delta(&self) -> bool {
        matches!(self, Self::PsdSmart | Self::Bsdiff)
    }

    /// The file extension used for artifacts of this strategy.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Lz4 => "lz4",
            Self::PsdSmart => "psd_smart",
            Self::Bsdiff => "bsdiff",
            Self::Zip => "zip",
            Self::Zstd => "zstd",
        }
    }
}
