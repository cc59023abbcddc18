//! The restore pipeline.
//!
//! A restore resolves its reference (version number, `v<N>` tag, or unique
//! hash prefix) to a commit record, then reconstructs the version by the
//! cheapest available method:
//!
//! 1. direct LZ4 snapshot in `versions/`
//! 2. cached LZ4 / optimized Zstd in `cache/`
//! 3. smart delta (self-contained payload)
//! 4. delta chain (backward plan, forward patch execution)
//! 5. legacy ZIP snapshot
//!
//! Matched entries are written below the caller-supplied output root.
//! Cancellation is honored between entries; already-written files stay put.

use crate::cancel::CancelToken;
use crate::error::{ErrorKind, Result};
use crate::materialize;
use dgit_compress::{Strategy, container, smart};
use dgit_storage::{CommitRecord, CommitStore, Layout};
use exn::{OptionExt, ResultExt};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// How a restore was ultimately served.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreMethod {
    /// Direct LZ4 snapshot from `versions/`.
    Lz4,
    /// Cached LZ4 or optimized Zstd snapshot from `cache/`.
    Cache,
    /// Smart-delta payload.
    SmartDelta,
    /// Backward walk plus forward patch execution.
    DeltaChain,
    /// Legacy ZIP snapshot.
    Zip,
}

impl RestoreMethod {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lz4 => "lz4",
            Self::Cache => "cache",
            Self::SmartDelta => "smart_delta",
            Self::DeltaChain => "delta_chain",
            Self::Zip => "zip",
        }
    }
}

impl std::fmt::Display for RestoreMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a restore.
#[derive(Debug)]
pub struct RestoreResult {
    pub version: u64,
    pub hash: String,
    pub method: RestoreMethod,
    /// Entries written to the output root, in artifact order.
    pub restored: Vec<String>,
    /// Entries excluded by the file filter.
    pub skipped: Vec<String>,
    /// Entries that matched but failed to write, with the reason.
    pub errored: Vec<(String, String)>,
}

/// Restore a version into `output_root`, optionally filtered to `files`.
#[instrument(skip_all, fields(reference = %reference, version = tracing::field::Empty))]
pub fn restore(
    layout: &Layout,
    store: &CommitStore,
    reference: &str,
    files: &[String],
    output_root: &Path,
    cancel: &CancelToken,
) -> Result<RestoreResult> {
    let record = resolve_reference(store, reference)?;
    let version = record.version;
    tracing::Span::current().record("version", version);
    let targets = normalize_targets(files);

    let (method, summary) = perform(layout, &record, &targets, output_root, cancel)?;
    cancel.checkpoint()?;

    info!(
        version,
        method = %method,
        restored = summary.restored.len(),
        skipped = summary.skipped.len(),
        "restore complete"
    );
    Ok(RestoreResult {
        version,
        hash: record.hash,
        method,
        restored: summary.restored,
        skipped: summary.skipped,
        errored: summary.errored,
    })
}

/// Resolve a version reference: decimal, `v<N>`, or a unique hash prefix.
pub fn resolve_reference(store: &CommitStore, reference: &str) -> Result<CommitRecord> {
    let version = reference
        .strip_prefix('v')
        .unwrap_or(reference)
        .parse::<u64>()
        .ok();
    match version {
        Some(version) => store.load(version).or_raise(|| ErrorKind::Storage),
        None => store.find_by_hash(reference).or_raise(|| ErrorKind::Storage),
    }
}

fn perform(
    layout: &Layout,
    record: &CommitRecord,
    targets: &[String],
    output_root: &Path,
    cancel: &CancelToken,
) -> Result<(RestoreMethod, container::UnpackSummary)> {
    let version = record.version;
    let filter = |entry: &str| !cancel.is_cancelled() && matches_targets(entry, targets);

    // Priority 1: direct snapshot.
    let direct = layout.version_snapshot(version);
    if direct.is_file() {
        debug!(version, "restoring from primary snapshot");
        let reader = container::open_artifact(&direct).or_raise(|| ErrorKind::Restore(version))?;
        let summary = container::unpack_stream(reader, output_root, filter).or_raise(|| ErrorKind::Restore(version))?;
        return Ok((RestoreMethod::Lz4, summary));
    }

    // Priority 2: cached snapshot (plain or optimized).
    for cached in [layout.cache_snapshot(version), layout.optimized_snapshot(version)] {
        if cached.is_file() {
            debug!(version, path = %cached.display(), "restoring from cache tier");
            let reader = container::open_artifact(&cached).or_raise(|| ErrorKind::Restore(version))?;
            let summary =
                container::unpack_stream(reader, output_root, filter).or_raise(|| ErrorKind::Restore(version))?;
            return Ok((RestoreMethod::Cache, summary));
        }
    }

    // Priority 3-5: guided by the commit record.
    match record.strategy().or_raise(|| ErrorKind::Storage)? {
        Some(Strategy::PsdSmart) => restore_smart(layout, record, targets, output_root),
        Some(Strategy::Zip) => {
            let info = record.compression_info.as_ref();
            let name = info.map(|i| i.output_file.clone()).or_else(|| record.snapshot_zip.clone());
            restore_zip(layout, version, name, targets, output_root, cancel)
        },
        Some(Strategy::Lz4 | Strategy::Zstd | Strategy::Bsdiff) | None => {
            if let Some(zip_name) = &record.snapshot_zip {
                return restore_zip(layout, version, Some(zip_name.clone()), targets, output_root, cancel);
            }
            debug!(version, "restoring through delta chain");
            let stream = materialize::record_stream(layout, version)?;
            let summary = container::unpack_stream(stream.as_slice(), output_root, filter)
                .or_raise(|| ErrorKind::Restore(version))?;
            Ok((RestoreMethod::DeltaChain, summary))
        },
    }
}

fn restore_smart(
    layout: &Layout,
    record: &CommitRecord,
    targets: &[String],
    output_root: &Path,
) -> Result<(RestoreMethod, container::UnpackSummary)> {
    let version = record.version;
    let info = record
        .compression_info
        .as_ref()
        .ok_or_raise(|| ErrorKind::Restore(version))?;
    // The artifact normally lives in cache/; tolerate a copy in versions/.
    let delta_path = [
        layout.cache_dir().join(&info.output_file),
        layout.versions_dir().join(&info.output_file),
    ]
    .into_iter()
    .find(|p| p.is_file())
    .ok_or_raise(|| ErrorKind::Restore(version))?;

    let (manifest, content) = smart::apply_to_vec(&delta_path).or_raise(|| ErrorKind::Restore(version))?;
    info!(version, summary = %manifest.layer_analysis.changes_summary, "applying smart delta");

    let mut summary = container::UnpackSummary::default();
    if !matches_targets(&manifest.file_path, targets) {
        summary.skipped.push(manifest.file_path);
        return Ok((RestoreMethod::SmartDelta, summary));
    }
    match write_entry(output_root, &manifest.file_path, &content) {
        Ok(()) => summary.restored.push(manifest.file_path),
        Err(reason) => summary.errored.push((manifest.file_path, reason)),
    }
    Ok((RestoreMethod::SmartDelta, summary))
}

fn restore_zip(
    layout: &Layout,
    version: u64,
    zip_name: Option<String>,
    targets: &[String],
    output_root: &Path,
    cancel: &CancelToken,
) -> Result<(RestoreMethod, container::UnpackSummary)> {
    let zip_path = match zip_name {
        Some(name) => layout.objects_dir().join(name),
        None => layout.legacy_snapshot(version),
    };
    let file = std::fs::File::open(&zip_path).map_err(ErrorKind::Io)?;
    let mut archive = zip::ZipArchive::new(file).or_raise(|| ErrorKind::Restore(version))?;

    let mut summary = container::UnpackSummary::default();
    for index in 0..archive.len() {
        if cancel.is_cancelled() {
            break;
        }
        let mut entry = archive.by_index(index).or_raise(|| ErrorKind::Restore(version))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().replace('\\', "/");
        if !matches_targets(&name, targets) {
            summary.skipped.push(name);
            continue;
        }
        let mut content = Vec::new();
        if let Err(err) = entry.read_to_end(&mut content) {
            summary.errored.push((name, err.to_string()));
            continue;
        }
        match write_entry(output_root, &name, &content) {
            Ok(()) => summary.restored.push(name),
            Err(reason) => summary.errored.push((name, reason)),
        }
    }
    Ok((RestoreMethod::Zip, summary))
}

/// Write one restored entry below the output root.
fn write_entry(output_root: &Path, entry_path: &str, content: &[u8]) -> std::result::Result<(), String> {
    let relative: PathBuf = container::sanitize_relative(entry_path).ok_or_else(|| "unsafe path".to_string())?;
    let target = output_root.join(relative);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|err| err.to_string())?;
    }
    std::fs::write(&target, content).map_err(|err| err.to_string())
}

fn normalize_targets(files: &[String]) -> Vec<String> {
    files
        .iter()
        .map(|f| {
            let normalized = f.replace('\\', "/");
            normalized.strip_prefix("./").unwrap_or(&normalized).to_string()
        })
        .filter(|f| !f.is_empty())
        .collect()
}

/// Whether an archive entry satisfies the requested file filter.
///
/// An empty filter matches everything. Otherwise an entry matches when any
/// requested path is an exact match, shares its basename, is a `dir/` prefix
/// of the entry, or appears (trimmed of slashes) as a substring of the entry
/// path.
fn matches_targets(entry: &str, targets: &[String]) -> bool {
    if targets.is_empty() {
        return true;
    }
    let entry = entry.replace('\\', "/");
    let entry_name = entry.rsplit('/').next().unwrap_or(&entry);
    targets.iter().any(|target| {
        entry == *target
            || entry_name == target.rsplit('/').next().unwrap_or(target)
            || (target.ends_with('/') && entry.starts_with(target.as_str()))
            || entry.contains(target.trim_matches('/'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn targets(list: &[&str]) -> Vec<String> {
        normalize_targets(&list.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(matches_targets("any/path.psd", &[]));
    }

    #[rstest]
    // Exact relative path
    #[case("mockups/home.psd", &["mockups/home.psd"], true)]
    // Basename equality
    #[case("mockups/home.psd", &["home.psd"], true)]
    // Directory prefix (trailing slash)
    #[case("mockups/home.psd", &["mockups/"], true)]
    // Substring of the entry path
    #[case("mockups/home.psd", &["ckups/ho"], true)]
    // Backslash normalization
    #[case("mockups/home.psd", &["mockups\\home.psd"], true)]
    // Leading ./ is stripped
    #[case("home.psd", &["./home.psd"], true)]
    // Non-matches
    #[case("mockups/home.psd", &["about.psd"], false)]
    #[case("mockups/home.psd", &["assets/"], false)]
    fn test_filter_semantics(#[case] entry: &str, #[case] filter: &[&str], #[case] expected: bool) {
        assert_eq!(matches_targets(entry, &targets(filter)), expected);
    }

    #[test]
    fn test_write_entry_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_entry(dir.path(), "../outside.txt", b"nope").unwrap_err();
        assert_eq!(err, "unsafe path");
    }
}
