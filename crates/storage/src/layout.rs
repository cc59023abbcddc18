//! On-disk layout of a repository's `.dgit/` directory.
//!
//! ```text
//! .dgit/
//! ├── versions/v<N>.lz4             primary snapshot artifacts
//! ├── cache/v<N>.lz4                secondary snapshot copies
//! ├── cache/v<N>_optimized.zstd     background re-encodes
//! ├── cache/v<N>_from_v<M>.bsdiff   binary-patch deltas
//! ├── cache/v<N>_from_v<M>.psd_smart
//! ├── commits/v<N>.json             commit records (the version index)
//! ├── staging/staged.json           staging index
//! ├── objects/v<N>.zip              legacy snapshots (read-only)
//! ├── objects/deltas/               legacy delta artifacts (read-only)
//! ├── HEAD                          current commit hash
//! └── config                        repository configuration
//! ```

use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};

/// Owned handle to a repository's `.dgit/` root.
///
/// The repository path is the engine's only piece of global state; everything
/// that touches the disk goes through a `Layout` passed down from the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Directory name of the repository metadata root.
    pub const DIR_NAME: &'static str = ".dgit";

    /// Wrap an existing `.dgit/` directory path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The layout for a working tree: `<work_root>/.dgit`.
    pub fn for_work_root(work_root: impl AsRef<Path>) -> Self {
        Self::new(work_root.as_ref().join(Self::DIR_NAME))
    }

    /// Create every writable directory of the layout.
    ///
    /// Idempotent. The legacy `objects/` tree is created too so older tools
    /// keep working, but this engine only ever reads from it.
    pub fn ensure(&self) -> Result<()> {
        for dir in [
            self.versions_dir(),
            self.commits_dir(),
            self.cache_dir(),
            self.staging_dir(),
            self.deltas_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(ErrorKind::Io)?;
        }
        Ok(())
    }

    /// Whether the metadata root exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    #[must_use]
    pub fn commits_dir(&self) -> PathBuf {
        self.root.join("commits")
    }

    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    #[must_use]
    pub fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    #[must_use]
    pub fn deltas_dir(&self) -> PathBuf {
        self.objects_dir().join("deltas")
    }

    #[must_use]
    pub fn head_file(&self) -> PathBuf {
        self.root.join("HEAD")
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config")
    }

    #[must_use]
    pub fn staging_file(&self) -> PathBuf {
        self.staging_dir().join("staged.json")
    }

    /// Primary snapshot artifact: `versions/v<N>.lz4`.
    #[must_use]
    pub fn version_snapshot(&self, version: u64) -> PathBuf {
        self.versions_dir().join(format!("v{version}.lz4"))
    }

    /// Secondary snapshot copy: `cache/v<N>.lz4`.
    #[must_use]
    pub fn cache_snapshot(&self, version: u64) -> PathBuf {
        self.cache_dir().join(format!("v{version}.lz4"))
    }

    /// Background-optimized re-encode: `cache/v<N>_optimized.zstd`.
    #[must_use]
    pub fn optimized_snapshot(&self, version: u64) -> PathBuf {
        self.cache_dir().join(format!("v{version}_optimized.zstd"))
    }

    /// Binary-patch delta: `cache/v<N>_from_v<M>.bsdiff`.
    #[must_use]
    pub fn binary_delta(&self, version: u64, base: u64) -> PathBuf {
        self.cache_dir().join(format!("v{version}_from_v{base}.bsdiff"))
    }

    /// Smart delta: `cache/v<N>_from_v<M>.psd_smart`.
    #[must_use]
    pub fn smart_delta(&self, version: u64, base: u64) -> PathBuf {
        self.cache_dir().join(format!("v{version}_from_v{base}.psd_smart"))
    }

    /// Legacy snapshot: `objects/v<N>.zip`.
    #[must_use]
    pub fn legacy_snapshot(&self, version: u64) -> PathBuf {
        self.objects_dir().join(format!("v{version}.zip"))
    }

    /// Commit record: `commits/v<N>.json`.
    #[must_use]
    pub fn commit_record(&self, version: u64) -> PathBuf {
        self.commits_dir().join(format!("v{version}.json"))
    }

    /// A scratch path inside `cache/` for temporary materializations.
    #[must_use]
    pub fn scratch(&self, label: &str) -> PathBuf {
        self.cache_dir().join(format!(".tmp_{label}"))
    }
}
