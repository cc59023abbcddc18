//! The staging area.
//!
//! Staged entries live in `.dgit/staging/staged.json` until the next commit
//! consumes them. Any file type may be staged — the strategy selector, not
//! the staging area, decides how design files are treated specially.

use crate::error::{ErrorKind, Result};
use crate::strategy::LARGE_FILE_THRESHOLD;
use dgit_storage::{CacheTier, Layout};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{debug, warn};

/// A file queued for the next commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StagedFile {
    /// Path relative to the working tree, with forward slashes.
    pub path: String,
    pub absolute_path: PathBuf,
    /// Lowercase extension tag; empty when the file has none.
    pub file_type: String,
    pub size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub mod_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
    /// Size-adaptive content fingerprint (full hex).
    pub hash: String,
    /// Tier the eventual artifact is expected to land in.
    pub cache_level: CacheTier,
    /// Reserved: set when a pre-compressed copy exists alongside the entry.
    #[serde(default)]
    pub pre_compressed: bool,
    /// Metadata extracted at staging time, when the file could be scanned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<dgit_scan::DesignFileInfo>,
}

/// The staging index for one repository.
#[derive(Debug)]
pub struct StagingArea {
    layout: Layout,
    work_root: PathBuf,
    files: BTreeMap<String, StagedFile>,
}

impl StagingArea {
    /// Load the staging index (empty when none exists yet).
    pub fn load(layout: &Layout, work_root: impl Into<PathBuf>) -> Result<Self> {
        let files = match std::fs::read(layout.staging_file()) {
            Ok(data) => serde_json::from_slice(&data).or_raise(|| ErrorKind::Staging)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(ErrorKind::Io(err).into()),
        };
        Ok(Self {
            layout: layout.clone(),
            work_root: work_root.into(),
            files,
        })
    }

    /// Persist the staging index.
    pub fn save(&self) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.files).or_raise(|| ErrorKind::Staging)?;
        std::fs::write(self.layout.staging_file(), data).map_err(ErrorKind::Io)?;
        Ok(())
    }

    /// Stage a file, replacing any previous entry for the same path.
    ///
    /// The file is fingerprinted immediately; light metadata extraction runs
    /// too, and its failure is logged but never fatal.
    pub fn add(&mut self, path: impl AsRef<Path>) -> Result<&StagedFile> {
        let given = path.as_ref();
        let absolute = if given.is_absolute() {
            given.to_path_buf()
        } else {
            self.work_root.join(given)
        };
        let meta = std::fs::metadata(&absolute).or_raise(|| ErrorKind::Stage(given.to_path_buf()))?;
        if !meta.is_file() {
            exn::bail!(ErrorKind::Stage(given.to_path_buf()));
        }
        let mod_time = meta
            .modified()
            .map(OffsetDateTime::from)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);

        let relative = relative_key(&self.work_root, &absolute);
        let hash = dgit_scan::file_fingerprint(&absolute).or_raise(|| ErrorKind::Stage(given.to_path_buf()))?;
        let metadata = match dgit_scan::scan_file(&absolute) {
            Ok(info) => Some(info),
            Err(err) => {
                warn!(path = %relative, error = %err, "metadata extraction failed while staging");
                None
            },
        };
        let cache_level = if meta.len() < LARGE_FILE_THRESHOLD {
            CacheTier::Versions
        } else {
            CacheTier::Cache
        };

        let entry = StagedFile {
            path: relative.clone(),
            absolute_path: absolute,
            file_type: dgit_scan::file_type(given).unwrap_or_default(),
            size: meta.len(),
            mod_time,
            added_at: OffsetDateTime::now_utc(),
            hash,
            cache_level,
            pre_compressed: false,
            metadata,
        };
        debug!(path = %relative, size = entry.size, "staged");
        self.files.insert(relative.clone(), entry);
        self.save()?;
        Ok(&self.files[&relative])
    }

    /// Remove a staged entry by working-tree path.
    pub fn remove(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let given = path.as_ref();
        let absolute = if given.is_absolute() {
            given.to_path_buf()
        } else {
            self.work_root.join(given)
        };
        let key = relative_key(&self.work_root, &absolute);
        if self.files.remove(&key).is_none() {
            exn::bail!(ErrorKind::Stage(given.to_path_buf()));
        }
        self.save()
    }

    /// Drop every staged entry.
    pub fn clear(&mut self) -> Result<()> {
        self.files.clear();
        self.save()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Staged entries in staging order (time added, then path).
    #[must_use]
    pub fn staged_files(&self) -> Vec<StagedFile> {
        let mut files: Vec<StagedFile> = self.files.values().cloned().collect();
        files.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.path.cmp(&b.path)));
        files
    }
}

/// Relative path of `absolute` under `work_root`, normalized to forward
/// slashes. Files outside the working tree fall back to their basename.
fn relative_key(work_root: &Path, absolute: &Path) -> String {
    let relative = absolute
        .strip_prefix(work_root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from(absolute.file_name().unwrap_or(absolute.as_os_str())));
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}
