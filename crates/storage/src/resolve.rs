//! Version-to-artifact resolution.
//!
//! Given a version number, find the best physical artifact that can produce
//! it, probing the storage hierarchy in priority order:
//!
//! 1. `versions/v<N>.lz4` — primary snapshot
//! 2. `cache/v<N>.lz4` — secondary snapshot copy
//! 3. `cache/v<N>_optimized.zstd` — background re-encode
//! 4. `objects/v<N>.zip` — legacy snapshot
//! 5. `cache/v<N>_from_v<N-1>.psd_smart` — smart delta (self-contained)
//! 6. `cache/v<N>_from_v<N-1>.bsdiff` — binary patch (requires N−1)
//!
//! A smart delta ranks above bsdiff because its payload reconstructs the
//! version on its own; a bsdiff artifact forces the caller to recurse into
//! the base version.

use crate::layout::Layout;
use dgit_compress::Strategy;
use std::path::PathBuf;
use tracing::debug;

/// A resolved physical artifact for one version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub version: u64,
    pub strategy: Strategy,
    pub path: PathBuf,
    /// The version this artifact decodes against; `None` for snapshots and
    /// smart deltas (whose payload is self-contained).
    pub base_version: Option<u64>,
    /// Whether the artifact came from the primary `versions/` tier.
    pub primary: bool,
}

impl Artifact {
    /// Whether this artifact alone can reproduce the version's files.
    #[must_use]
    pub fn is_self_contained(&self) -> bool {
        self.base_version.is_none()
    }
}

/// Find the best artifact producing `version`, or `None` if nothing
/// reachable exists.
#[must_use]
pub fn resolve(layout: &Layout, version: u64) -> Option<Artifact> {
    let candidates = [
        (layout.version_snapshot(version), Strategy::Lz4, None, true),
        (layout.cache_snapshot(version), Strategy::Lz4, None, false),
        (layout.optimized_snapshot(version), Strategy::Zstd, None, false),
        (layout.legacy_snapshot(version), Strategy::Zip, None, false),
    ];
    for (path, strategy, base_version, primary) in candidates {
        if path.is_file() {
            debug!(version, strategy = %strategy, path = %path.display(), "resolved artifact");
            return Some(Artifact { version, strategy, path, base_version, primary });
        }
    }

    if version > 1 {
        let base = version - 1;
        let smart = layout.smart_delta(version, base);
        if smart.is_file() {
            debug!(version, base, "resolved smart-delta artifact");
            // Encoded against `base`, but the payload is self-contained.
            return Some(Artifact {
                version,
                strategy: Strategy::PsdSmart,
                path: smart,
                base_version: None,
                primary: false,
            });
        }
        let patch = layout.binary_delta(version, base);
        if patch.is_file() {
            debug!(version, base, "resolved bsdiff artifact");
            return Some(Artifact {
                version,
                strategy: Strategy::Bsdiff,
                path: patch,
                base_version: Some(base),
                primary: false,
            });
        }
    }
    None
}
