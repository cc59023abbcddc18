//! Commit, storage, and restore pipelines for DGit.
//!
//! A [`Repository`] owns the `.dgit/` layout of one working tree and wires
//! the pieces together: the [staging area](StagingArea), the
//! [strategy selector](strategy::select), the [commit](commit) and
//! [restore](restore) pipelines, and the background
//! [snapshot optimizer](optimize::Optimizer).
//!
//! The engine is single-writer: one commit at a time per repository,
//! serialized by the caller. Read operations (restore, log) observe
//! atomicity at the commit-record boundary — a version exists exactly when
//! its `commits/v<N>.json` does.
//!
//! ```no_run
//! use dgit_engine::Repository;
//!
//! # fn example() -> dgit_engine::error::Result<()> {
//! let mut repo = Repository::init("/work/project")?;
//! repo.stage("mockups/home.psd")?;
//! let record = repo.commit("first pass at the homepage")?;
//! repo.restore(&format!("v{}", record.version), &[], "/work/project")?;
//! # Ok(())
//! # }
//! ```

pub mod cancel;
mod commit;
mod config;
pub mod error;
mod materialize;
mod optimize;
mod restore;
mod staging;
pub mod strategy;

pub use crate::cancel::CancelToken;
pub use crate::config::RepoConfig;
pub use crate::optimize::Optimizer;
pub use crate::restore::{RestoreMethod, RestoreResult};
pub use crate::staging::{StagedFile, StagingArea};

use crate::error::{ErrorKind, Result};
use dgit_compress::Strategy;
use dgit_storage::{CommitRecord, CommitStore, Layout};
use std::path::{Path, PathBuf};
use tracing::warn;

/// An open repository: the owned `.dgit/` handle plus session state.
#[derive(Debug)]
pub struct Repository {
    work_root: PathBuf,
    layout: Layout,
    config: RepoConfig,
    store: CommitStore,
    staging: StagingArea,
    optimizer: Option<Optimizer>,
}

impl Repository {
    /// Create the repository skeleton (idempotent) and open it.
    pub fn init(work_root: impl Into<PathBuf>) -> Result<Self> {
        let work_root = work_root.into();
        let layout = Layout::for_work_root(&work_root);
        layout.ensure().map_err(storage_err)?;
        let config = RepoConfig::load(&layout)?;
        if !layout.config_file().is_file() {
            config.save(&layout)?;
        }
        Self::open_with(work_root, layout, config)
    }

    /// Open an existing repository.
    ///
    /// # Errors
    ///
    /// Raises [`NotInitialized`](ErrorKind::NotInitialized) when the working
    /// tree has no `.dgit/` directory.
    pub fn open(work_root: impl Into<PathBuf>) -> Result<Self> {
        let work_root = work_root.into();
        let layout = Layout::for_work_root(&work_root);
        if !layout.exists() {
            exn::bail!(ErrorKind::NotInitialized(work_root));
        }
        layout.ensure().map_err(storage_err)?;
        let config = RepoConfig::load(&layout)?;
        Self::open_with(work_root, layout, config)
    }

    fn open_with(work_root: PathBuf, layout: Layout, config: RepoConfig) -> Result<Self> {
        let store = CommitStore::new(&layout);
        let staging = StagingArea::load(&layout, &work_root)?;
        let optimizer = if config.background_optimization {
            match Optimizer::spawn(layout.clone()) {
                Ok(optimizer) => Some(optimizer),
                Err(err) => {
                    warn!(error = %err, "background optimizer unavailable");
                    None
                },
            }
        } else {
            None
        };
        Ok(Self { work_root, layout, config, store, staging, optimizer })
    }

    #[must_use]
    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Stage a file for the next commit.
    pub fn stage(&mut self, path: impl AsRef<Path>) -> Result<&StagedFile> {
        self.staging.add(path)
    }

    /// Remove a file from the staging area.
    pub fn unstage(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.staging.remove(path)
    }

    /// The staged set, in staging order.
    #[must_use]
    pub fn staged_files(&self) -> Vec<StagedFile> {
        self.staging.staged_files()
    }

    /// Commit the staged set.
    pub fn commit(&mut self, message: &str) -> Result<CommitRecord> {
        self.commit_with(message, &CancelToken::new())
    }

    /// Commit the staged set with caller-supplied cancellation.
    pub fn commit_with(&mut self, message: &str, cancel: &CancelToken) -> Result<CommitRecord> {
        let record = commit::create_commit(
            &self.layout,
            &self.store,
            &self.config,
            &mut self.staging,
            message,
            cancel,
        )?;
        if let (Some(optimizer), Ok(Some(Strategy::Lz4))) = (&self.optimizer, record.strategy()) {
            optimizer.enqueue(record.version);
        }
        Ok(record)
    }

    /// Restore a version into `output_root`.
    ///
    /// `reference` accepts a decimal version, a `v<N>` tag, or a unique
    /// commit-hash prefix of at least four characters. An empty `files`
    /// filter restores everything.
    pub fn restore(
        &self,
        reference: &str,
        files: &[String],
        output_root: impl AsRef<Path>,
    ) -> Result<RestoreResult> {
        self.restore_with(reference, files, output_root, &CancelToken::new())
    }

    /// [`restore`](Self::restore) with caller-supplied cancellation.
    pub fn restore_with(
        &self,
        reference: &str,
        files: &[String],
        output_root: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> Result<RestoreResult> {
        restore::restore(&self.layout, &self.store, reference, files, output_root.as_ref(), cancel)
    }

    /// Commit history, newest first.
    pub fn log(&self) -> Result<Vec<CommitRecord>> {
        self.store.history().map_err(storage_err)
    }

    /// Load one commit record by version.
    pub fn commit_record(&self, version: u64) -> Result<CommitRecord> {
        self.store.load(version).map_err(storage_err)
    }

    /// Highest committed version, or 0 for an empty repository.
    pub fn current_version(&self) -> Result<u64> {
        self.store.current_version().map_err(storage_err)
    }

    /// The HEAD commit hash, if any commit exists.
    pub fn head(&self) -> Result<Option<String>> {
        self.store.head().map_err(storage_err)
    }

    /// Shut down background work and release the repository.
    ///
    /// Dropping the repository does the same; `close` merely makes the
    /// drain-and-join explicit.
    pub fn close(mut self) {
        if let Some(optimizer) = self.optimizer.take() {
            optimizer.shutdown();
        }
    }
}

/// Re-raise a storage error under the engine's error tree.
#[track_caller]
fn storage_err(err: dgit_storage::error::Error) -> error::Error {
    err.raise(ErrorKind::Storage)
}
