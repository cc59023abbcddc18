//! Shared utilities for engine integration tests.

#![allow(dead_code)]

pub mod fixtures;

use dgit_engine::{RepoConfig, Repository};
use dgit_storage::Layout;
use std::path::{Path, PathBuf};

/// A repository rooted in a temp directory, dropped with it.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> Layout {
        Layout::for_work_root(self.dir.path())
    }

    /// A scratch directory for restore output, outside the working tree.
    pub fn out_dir(&self, name: &str) -> PathBuf {
        let out = self.dir.path().join(name);
        std::fs::create_dir_all(&out).unwrap();
        out
    }

    /// Write a file into the working tree and return its absolute path.
    pub fn write_file(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// New repository with background optimization off for determinism.
pub fn test_repo() -> TestRepo {
    test_repo_with(|config| config.background_optimization = false)
}

/// New repository with a tweaked configuration.
pub fn test_repo_with(tweak: impl FnOnce(&mut RepoConfig)) -> TestRepo {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::for_work_root(dir.path());
    layout.ensure().unwrap();
    let mut config = RepoConfig::default();
    tweak(&mut config);
    config.save(&layout).unwrap();
    let repo = Repository::open(dir.path()).unwrap();
    TestRepo { dir, repo }
}
