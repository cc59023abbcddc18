//! Commit record models.
//!
//! These types are the on-disk JSON of `commits/v<N>.json`; field names are
//! part of the repository format and must not change. Records are written
//! once at commit time and never modified.

use crate::error::{ErrorKind, Result};
use dgit_compress::Strategy;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Which tier of the storage hierarchy an artifact lives in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    /// Primary storage: `versions/`.
    #[default]
    Versions,
    /// Secondary storage: `cache/`.
    Cache,
}

impl CacheTier {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Versions => "versions",
            Self::Cache => "cache",
        }
    }
}

/// Per-file metadata captured at commit time.
///
/// When scanning fails, only `type`/`size`/`last_modified`/`scan_error` are
/// populated — a commit never fails because a file wouldn't parse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layer_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_error: Option<String>,
}

/// How a version's artifact was encoded, with observed metrics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompressionInfo {
    /// Strategy tag. Kept as a string on the wire so that a record written
    /// by a newer engine surfaces as [`UnknownStrategy`](ErrorKind::UnknownStrategy)
    /// rather than a parse failure; use [`strategy()`](Self::strategy).
    pub strategy: String,
    /// Artifact filename within its tier directory.
    pub output_file: String,
    pub original_size: u64,
    pub compressed_size: u64,
    /// `compressed_size / original_size`.
    pub compression_ratio: f64,
    /// Base version for delta strategies. Always strictly less than the
    /// record's own version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<u64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub compression_time_ms: f64,
    pub cache_level: CacheTier,
    /// Cosmetic telemetry carried over from the original engine
    /// (`45000 / compression_time_ms`). Never gates behavior.
    pub speed_improvement: f64,
}

impl CompressionInfo {
    /// The typed strategy for this record.
    ///
    /// # Errors
    ///
    /// Raises [`UnknownStrategy`](ErrorKind::UnknownStrategy) when the tag is
    /// not in the current codec set.
    pub fn strategy(&self) -> Result<Strategy> {
        self.strategy
            .parse::<Strategy>()
            .or_raise(|| ErrorKind::UnknownStrategy(self.strategy.clone()))
    }
}

/// A single immutable commit record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// 12-hex-character commit hash.
    pub hash: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub author: String,
    pub files_count: usize,
    /// Monotone version number, starting at 1.
    pub version: u64,
    /// Per-file metadata keyed by relative path.
    #[serde(default)]
    pub metadata: BTreeMap<String, FileMeta>,
    /// Hash of the previous commit; empty for the first.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_hash: String,
    /// Legacy ZIP snapshot filename, for repositories written by older
    /// engines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_zip: Option<String>,
    /// Absent only in legacy records, which are restored via `snapshot_zip`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_info: Option<CompressionInfo>,
}

impl CommitRecord {
    /// The typed strategy of this record's artifact, if it has one.
    pub fn strategy(&self) -> Result<Option<Strategy>> {
        self.compression_info.as_ref().map(CompressionInfo::strategy).transpose()
    }
}
