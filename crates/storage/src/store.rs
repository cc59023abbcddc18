//! Commit record store.
//!
//! The version index has no separate database: it *is* the set of
//! `commits/v<N>.json` files. Writing a record is the final, atomic step of a
//! commit (temp file + rename), so a version is observable exactly when its
//! record is — readers never see a half-committed version.

use crate::error::{ErrorKind, Result};
use crate::layout::Layout;
use crate::models::CommitRecord;
use exn::ResultExt;
use std::path::Path;
use tracing::{debug, warn};

/// Minimum hash-prefix length accepted as a commit reference.
pub const MIN_HASH_PREFIX: usize = 4;

/// Reads and writes commit records and HEAD.
#[derive(Clone, Debug)]
pub struct CommitStore {
    layout: Layout,
}

impl CommitStore {
    pub fn new(layout: &Layout) -> Self {
        Self { layout: layout.clone() }
    }

    /// All committed version numbers, ascending. Missing `commits/` reads as
    /// empty (freshly initialized repository).
    pub fn versions(&self) -> Result<Vec<u64>> {
        let dir = self.layout.commits_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(ErrorKind::Io(err).into()),
        };
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(ErrorKind::Io)?;
            if let Some(version) = parse_record_name(&entry.file_name()) {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    /// Highest committed version, or 0 for an empty repository.
    pub fn current_version(&self) -> Result<u64> {
        Ok(self.versions()?.into_iter().max().unwrap_or(0))
    }

    /// Load the record for a version.
    pub fn load(&self, version: u64) -> Result<CommitRecord> {
        let path = self.layout.commit_record(version);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                exn::bail!(ErrorKind::VersionNotFound(version));
            },
            Err(err) => return Err(ErrorKind::Io(err).into()),
        };
        serde_json::from_slice(&data).or_raise(|| ErrorKind::CorruptRecord(path))
    }

    /// Persist a record atomically (write temp, rename into place).
    ///
    /// The rename is the commit point: until it happens the version does not
    /// exist as far as any reader is concerned.
    pub fn save(&self, record: &CommitRecord) -> Result<()> {
        let path = self.layout.commit_record(record.version);
        let data = serde_json::to_vec_pretty(record).or_raise(|| ErrorKind::CorruptRecord(path.clone()))?;
        write_atomic(&path, &data)?;
        debug!(version = record.version, hash = %record.hash, "commit record persisted");
        Ok(())
    }

    /// Find the unique commit whose hash starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Prefixes shorter than [`MIN_HASH_PREFIX`] or matching nothing raise
    /// [`ReferenceNotFound`](ErrorKind::ReferenceNotFound); multiple matches
    /// raise [`AmbiguousReference`](ErrorKind::AmbiguousReference).
    pub fn find_by_hash(&self, prefix: &str) -> Result<CommitRecord> {
        if prefix.len() < MIN_HASH_PREFIX || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            exn::bail!(ErrorKind::ReferenceNotFound(prefix.to_string()));
        }
        let mut matched = None;
        for version in self.versions()? {
            let record = match self.load(version) {
                Ok(record) => record,
                Err(err) => {
                    warn!(version, error = %err, "skipping unreadable commit record");
                    continue;
                },
            };
            if record.hash.starts_with(prefix) {
                if matched.is_some() {
                    exn::bail!(ErrorKind::AmbiguousReference(prefix.to_string()));
                }
                matched = Some(record);
            }
        }
        match matched {
            Some(record) => Ok(record),
            None => exn::bail!(ErrorKind::ReferenceNotFound(prefix.to_string())),
        }
    }

    /// Full commit history, newest first.
    pub fn history(&self) -> Result<Vec<CommitRecord>> {
        let mut records = Vec::new();
        for version in self.versions()? {
            match self.load(version) {
                Ok(record) => records.push(record),
                Err(err) => warn!(version, error = %err, "skipping unreadable commit record"),
            }
        }
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.version.cmp(&a.version)));
        Ok(records)
    }

    /// Current HEAD hash, if any. Trailing whitespace is trimmed.
    pub fn head(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(self.layout.head_file()) {
            Ok(content) => {
                let hash = content.trim().to_string();
                Ok((!hash.is_empty()).then_some(hash))
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ErrorKind::Io(err).into()),
        }
    }

    /// Point HEAD at a commit hash.
    pub fn set_head(&self, hash: &str) -> Result<()> {
        std::fs::write(self.layout.head_file(), hash).map_err(ErrorKind::Io)?;
        Ok(())
    }
}

/// Write `data` to `path` via a temp file and atomic rename.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = Path::new(&temp);
    std::fs::write(temp, data).map_err(ErrorKind::Io)?;
    std::fs::rename(temp, path).map_err(|err| {
        let _ = std::fs::remove_file(temp);
        ErrorKind::Io(err)
    })?;
    Ok(())
}

/// Parse `v<decimal>.json` into a version number.
fn parse_record_name(name: &std::ffi::OsStr) -> Option<u64> {
    let name = name.to_str()?;
    name.strip_prefix('v')?.strip_suffix(".json")?.parse().ok()
}
