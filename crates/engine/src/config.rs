//! Repository configuration.
//!
//! Stored as JSON at `.dgit/config`. Every field has a default, so a missing
//! or partial file always yields a working configuration; an unparseable file
//! is logged and replaced by the defaults rather than blocking the engine.

use crate::error::{ErrorKind, Result};
use dgit_storage::Layout;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Commit author recorded in every commit.
    pub author: String,
    /// Longest allowed run of delta artifacts before a snapshot is forced.
    pub max_delta_chain_length: usize,
    /// A delta whose `size / original` ratio exceeds this is discarded in
    /// favor of an LZ4 snapshot. Exactly at the threshold is accepted.
    pub delta_ratio_threshold: f64,
    /// An LZ4 snapshot growing beyond this ratio fails the commit. Exactly
    /// at the limit is accepted.
    pub snapshot_ratio_limit: f64,
    /// Whether to re-encode LZ4 snapshots to Zstd in the background.
    pub background_optimization: bool,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            author: "DGit User".to_string(),
            max_delta_chain_length: 5,
            delta_ratio_threshold: 0.7,
            snapshot_ratio_limit: 1.2,
            background_optimization: true,
        }
    }
}

impl RepoConfig {
    /// Load the configuration, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(layout: &Layout) -> Result<Self> {
        let path = layout.config_file();
        match std::fs::read(&path) {
            Ok(data) => match serde_json::from_slice(&data) {
                Ok(config) => Ok(config),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "unparseable config, using defaults");
                    Ok(Self::default())
                },
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ErrorKind::Io(err).into()),
        }
    }

    /// Persist the configuration.
    pub fn save(&self, layout: &Layout) -> Result<()> {
        let data = serde_json::to_vec_pretty(self).or_raise(|| ErrorKind::Config)?;
        std::fs::write(layout.config_file(), data).map_err(ErrorKind::Io)?;
        Ok(())
    }
}
