//! Compression strategy selection.
//!
//! The rules, applied in order:
//!
//! 1. Version 1 has no base — snapshot.
//! 2. Any file over 50 MiB, or any delta-friendly design file
//!    (`.psd`/`.ai`/`.sketch`), prefers a delta.
//! 3. A delta refines to a smart delta only when the staged set is exactly
//!    one PSD (a smart delta carries a single document; anything else would
//!    drop files from the version). Otherwise bsdiff.
//! 4. A delta is vetoed when the chain below the previous version has
//!    already reached the configured cap — restore cost is bounded by
//!    forcing a fresh snapshot.
//!
//! Chain length is measured on the delta graph recorded in commit records
//! (`base_version` links), not on the presence of any legacy artifact.

use crate::config::RepoConfig;
use crate::error::Result;
use crate::staging::StagedFile;
use dgit_compress::Strategy;
use dgit_storage::CommitStore;
use tracing::{debug, info};

/// Files larger than this amortize delta cost well.
pub const LARGE_FILE_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Design extensions that prefer delta encoding.
const DELTA_EXTENSIONS: &[&str] = &["psd", "ai", "sketch"];

/// Choose the encoding strategy for a new version.
pub fn select(files: &[StagedFile], version: u64, store: &CommitStore, config: &RepoConfig) -> Result<Strategy> {
    if version <= 1 {
        return Ok(Strategy::Lz4);
    }

    let large_file = files.iter().any(|f| f.size > LARGE_FILE_THRESHOLD);
    let design_file = files.iter().any(|f| DELTA_EXTENSIONS.contains(&f.file_type.as_str()));
    if !large_file && !design_file {
        return Ok(Strategy::Lz4);
    }

    let chain = chain_length(store, version - 1);
    if chain >= config.max_delta_chain_length {
        info!(chain, cap = config.max_delta_chain_length, "delta chain at cap, forcing snapshot");
        return Ok(Strategy::Lz4);
    }

    let single_psd = files.len() == 1 && files[0].file_type == "psd";
    let strategy = if single_psd { Strategy::PsdSmart } else { Strategy::Bsdiff };
    debug!(version, %strategy, large_file, design_file, "delta strategy selected");
    Ok(strategy)
}

/// Number of consecutive delta artifacts from `version` down to the nearest
/// snapshot, following `base_version` links in the commit records.
///
/// A missing or legacy record terminates the walk — whatever is below it
/// cannot lengthen a restore through this version.
#[must_use]
pub fn chain_length(store: &CommitStore, version: u64) -> usize {
    let mut length = 0;
    let mut current = version;
    while current >= 1 {
        let record = match store.load(current) {
            Ok(record) => record,
            Err(_) => break,
        };
        let Some(info) = record.compression_info else { break };
        let Ok(strategy) = info.strategy() else { break };
        if !strategy.is_delta() {
            break;
        }
        length += 1;
        match info.base_version {
            Some(base) if base < current => current = base,
            _ => break,
        }
    }
    length
}

#[cfg(test)]
mod tests {
    use super::*;
    use dgit_storage::{CacheTier, CommitRecord, CompressionInfo, Layout};
    use rstest::rstest;
    use std::collections::BTreeMap;
    use time::OffsetDateTime;

    fn staged(name: &str, size: u64) -> StagedFile {
        StagedFile {
            path: name.to_string(),
            absolute_path: std::path::PathBuf::from(format!("/work/{name}")),
            file_type: dgit_scan::file_type(name).unwrap_or_default(),
            size,
            mod_time: OffsetDateTime::UNIX_EPOCH,
            added_at: OffsetDateTime::UNIX_EPOCH,
            hash: "00".repeat(32),
            cache_level: CacheTier::Versions,
            pre_compressed: false,
            metadata: None,
        }
    }

    fn store_with(dir: &tempfile::TempDir, strategies: &[(&str, Option<u64>)]) -> CommitStore {
        let layout = Layout::for_work_root(dir.path());
        layout.ensure().unwrap();
        let store = CommitStore::new(&layout);
        for (index, (strategy, base_version)) in strategies.iter().enumerate() {
            let version = index as u64 + 1;
            store
                .save(&CommitRecord {
                    hash: format!("{version:012}"),
                    message: String::new(),
                    timestamp: OffsetDateTime::from_unix_timestamp(version as i64).unwrap(),
                    author: "DGit User".to_string(),
                    files_count: 1,
                    version,
                    metadata: BTreeMap::new(),
                    parent_hash: String::new(),
                    snapshot_zip: None,
                    compression_info: Some(CompressionInfo {
                        strategy: strategy.to_string(),
                        output_file: String::new(),
                        original_size: 100,
                        compressed_size: 50,
                        compression_ratio: 0.5,
                        base_version: *base_version,
                        created_at: OffsetDateTime::from_unix_timestamp(0).unwrap(),
                        compression_time_ms: 1.0,
                        cache_level: CacheTier::Versions,
                        speed_improvement: 45000.0,
                    }),
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn test_first_version_is_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, &[]);
        let files = vec![staged("design.psd", 1024)];
        assert_eq!(select(&files, 1, &store, &RepoConfig::default()).unwrap(), Strategy::Lz4);
    }

    #[test]
    fn test_plain_files_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, &[("lz4", None)]);
        let files = vec![staged("icon.png", 12 * 1024), staged("notes.txt", 400)];
        assert_eq!(select(&files, 2, &store, &RepoConfig::default()).unwrap(), Strategy::Lz4);
    }

    #[test]
    fn test_single_psd_takes_smart_delta() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, &[("lz4", None)]);
        let files = vec![staged("design.psd", 1024)];
        assert_eq!(select(&files, 2, &store, &RepoConfig::default()).unwrap(), Strategy::PsdSmart);
    }

    #[rstest]
    #[case("logo.ai")]
    #[case("wire.sketch")]
    fn test_other_design_files_take_bsdiff(#[case] name: &str) {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, &[("lz4", None)]);
        let files = vec![staged(name, 1024)];
        assert_eq!(select(&files, 2, &store, &RepoConfig::default()).unwrap(), Strategy::Bsdiff);
    }

    #[test]
    fn test_psd_with_companions_takes_bsdiff() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, &[("lz4", None)]);
        let files = vec![staged("design.psd", 1024), staged("notes.txt", 64)];
        assert_eq!(select(&files, 2, &store, &RepoConfig::default()).unwrap(), Strategy::Bsdiff);
    }

    #[test]
    fn test_large_plain_file_takes_delta() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, &[("lz4", None)]);
        let files = vec![staged("render.mov", LARGE_FILE_THRESHOLD + 1)];
        assert_eq!(select(&files, 2, &store, &RepoConfig::default()).unwrap(), Strategy::Bsdiff);
    }

    #[test]
    fn test_chain_length_counts_delta_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, &[("lz4", None), ("bsdiff", Some(1)), ("psd_smart", Some(2))]);
        assert_eq!(chain_length(&store, 3), 2);
        assert_eq!(chain_length(&store, 2), 1);
        assert_eq!(chain_length(&store, 1), 0);
    }

    #[test]
    fn test_chain_cap_forces_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, &[("lz4", None), ("bsdiff", Some(1)), ("bsdiff", Some(2))]);
        let config = RepoConfig { max_delta_chain_length: 2, ..RepoConfig::default() };
        let files = vec![staged("design.psd", 1024)];
        // v4: chain below v3 is already 2 deltas long.
        assert_eq!(select(&files, 4, &store, &config).unwrap(), Strategy::Lz4);
        // With a roomier cap the same commit takes a delta.
        let roomy = RepoConfig { max_delta_chain_length: 5, ..RepoConfig::default() };
        assert_eq!(select(&files, 4, &store, &roomy).unwrap(), Strategy::PsdSmart);
    }
}
