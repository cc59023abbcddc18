//! The commit pipeline.
//!
//! A commit flows through: validate staging → allocate version → hash →
//! scan per-file metadata → select strategy → encode → persist record →
//! update HEAD. The record write is the commit point; any failure or
//! cancellation before it unlinks partial artifacts and leaves the
//! repository exactly as it was.
//!
//! Delta encodings degrade rather than fail: a smart delta that cannot be
//! built falls back to a binary delta, and any delta whose ratio exceeds the
//! configured threshold is discarded in favor of a fresh LZ4 snapshot. Only
//! the snapshot itself failing (including the 1.2 expansion guard) fails the
//! commit.

use crate::cancel::CancelToken;
use crate::config::RepoConfig;
use crate::error::{ErrorKind, Result};
use crate::materialize;
use crate::staging::{StagedFile, StagingArea};
use crate::strategy;
use dgit_compress::container::PackEntry;
use dgit_compress::{SmartDeltaManifest, Strategy, container, patch, smart};
use dgit_scan::ChangeAnalysis;
use dgit_storage::{CacheTier, CommitRecord, CommitStore, CompressionInfo, FileMeta, Layout};
use exn::{OptionExt, ResultExt};
use std::collections::BTreeMap;
use std::time::Instant;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

/// Baseline used for the cosmetic `speed_improvement` telemetry field.
const SPEED_BASELINE_MS: f64 = 45_000.0;

/// Run the full commit pipeline over the staged set.
#[instrument(skip_all, fields(version = tracing::field::Empty))]
pub fn create_commit(
    layout: &Layout,
    store: &CommitStore,
    config: &RepoConfig,
    staging: &mut StagingArea,
    message: &str,
    cancel: &CancelToken,
) -> Result<CommitRecord> {
    let files = staging.staged_files();
    if files.is_empty() {
        exn::bail!(ErrorKind::EmptyStaging);
    }
    cancel.checkpoint()?;

    let version = store.current_version().or_raise(|| ErrorKind::Storage)? + 1;
    tracing::Span::current().record("version", version);
    let timestamp = OffsetDateTime::now_utc();
    let hash = dgit_scan::commit_hash(
        message,
        version,
        timestamp,
        files.iter().map(|f| (f.absolute_path.as_path(), f.size, f.mod_time)),
    );
    let parent_hash = store.head().or_raise(|| ErrorKind::Storage)?.unwrap_or_default();
    let metadata = scan_metadata(&files);

    let selected = strategy::select(&files, version, store, config)?;
    cancel.checkpoint()?;
    let compression = encode(layout, config, &files, version, selected)?;

    // Cancelled after encoding: the artifact must not become reachable.
    if cancel.is_cancelled() {
        remove_artifact(layout, &compression);
        exn::bail!(ErrorKind::Cancelled);
    }

    let record = CommitRecord {
        hash: hash.clone(),
        message: message.to_string(),
        timestamp,
        author: config.author.clone(),
        files_count: files.len(),
        version,
        metadata,
        parent_hash,
        snapshot_zip: None,
        compression_info: Some(compression.clone()),
    };
    if let Err(err) = store.save(&record) {
        remove_artifact(layout, &compression);
        return Err(err).or_raise(|| ErrorKind::Commit);
    }
    store.set_head(&hash).or_raise(|| ErrorKind::Commit)?;
    staging.clear()?;

    info!(
        version,
        hash = %record.hash,
        strategy = %compression.strategy,
        ratio = compression.compression_ratio,
        "commit created"
    );
    Ok(record)
}

/// Encode the staged set with `selected`, applying the documented fallbacks.
fn encode(
    layout: &Layout,
    config: &RepoConfig,
    files: &[StagedFile],
    version: u64,
    selected: Strategy,
) -> Result<CompressionInfo> {
    match selected {
        Strategy::Lz4 | Strategy::Zip | Strategy::Zstd => encode_snapshot(layout, config, files, version),
        Strategy::PsdSmart => match encode_smart(layout, files, version) {
            Ok(info) if info.compression_ratio <= config.delta_ratio_threshold => Ok(info),
            Ok(info) => {
                warn!(ratio = info.compression_ratio, "smart delta ineffective, re-encoding as snapshot");
                remove_artifact(layout, &info);
                encode_snapshot(layout, config, files, version)
            },
            Err(err) => {
                warn!(error = %err, "smart delta failed, falling back to binary delta");
                encode_bsdiff_or_snapshot(layout, config, files, version)
            },
        },
        Strategy::Bsdiff => encode_bsdiff_or_snapshot(layout, config, files, version),
    }
}

fn encode_bsdiff_or_snapshot(
    layout: &Layout,
    config: &RepoConfig,
    files: &[StagedFile],
    version: u64,
) -> Result<CompressionInfo> {
    match encode_bsdiff(layout, files, version) {
        Ok(info) if info.compression_ratio <= config.delta_ratio_threshold => Ok(info),
        Ok(info) => {
            warn!(ratio = info.compression_ratio, "binary delta ineffective, re-encoding as snapshot");
            remove_artifact(layout, &info);
            encode_snapshot(layout, config, files, version)
        },
        Err(err) => {
            warn!(error = %err, "binary delta failed, re-encoding as snapshot");
            encode_snapshot(layout, config, files, version)
        },
    }
}

fn encode_snapshot(layout: &Layout, config: &RepoConfig, files: &[StagedFile], version: u64) -> Result<CompressionInfo> {
    let started = Instant::now();
    let out = layout.version_snapshot(version);
    let stats =
        container::pack(&pack_entries(files), &out, config.snapshot_ratio_limit).or_raise(|| ErrorKind::Compression)?;
    Ok(compression_info(
        Strategy::Lz4,
        artifact_name(&out),
        stats.original_size,
        stats.compressed_size,
        None,
        CacheTier::Versions,
        started,
    ))
}

fn encode_bsdiff(layout: &Layout, files: &[StagedFile], version: u64) -> Result<CompressionInfo> {
    let started = Instant::now();
    let base_version = version - 1;
    let base = materialize::record_stream(layout, base_version)?;
    let mut target = Vec::new();
    let original_size = container::write_records(&pack_entries(files), &mut target).or_raise(|| ErrorKind::Compression)?;

    let out = layout.binary_delta(version, base_version);
    let compressed_size = patch::diff(&base, &target, &out).or_raise(|| ErrorKind::Compression)?;
    Ok(compression_info(
        Strategy::Bsdiff,
        artifact_name(&out),
        original_size,
        compressed_size,
        Some(base_version),
        CacheTier::Cache,
        started,
    ))
}

fn encode_smart(layout: &Layout, files: &[StagedFile], version: u64) -> Result<CompressionInfo> {
    let started = Instant::now();
    let psd = files
        .iter()
        .find(|f| f.file_type == "psd")
        .ok_or_raise(|| ErrorKind::Commit)?;
    let base_version = version - 1;

    // Reconstruct the base document so both revisions go through the parser.
    let base_bytes = materialize::extract_file(layout, base_version, &psd.path)?
        .ok_or_raise(|| ErrorKind::Restore(base_version))?;
    let scratch = layout.scratch(&format!("base_v{base_version}.psd"));
    std::fs::write(&scratch, &base_bytes).map_err(ErrorKind::Io)?;

    let result = (|| -> Result<CompressionInfo> {
        let old = dgit_scan::psd::read_detailed(&scratch).or_raise(|| ErrorKind::Scan)?;
        let new = dgit_scan::psd::read_detailed(&psd.absolute_path).or_raise(|| ErrorKind::Scan)?;
        let analysis = ChangeAnalysis::between(&old.layers, &new.layers);
        info!(from = base_version, to = version, summary = %analysis.changes_summary, "psd layer analysis");

        let manifest = SmartDeltaManifest::new(base_version, version, psd.path.clone(), psd.size, analysis);
        let out = layout.smart_delta(version, base_version);
        let compressed_size = smart::encode(&manifest, &psd.absolute_path, &out).or_raise(|| ErrorKind::Compression)?;
        Ok(compression_info(
            Strategy::PsdSmart,
            artifact_name(&out),
            psd.size,
            compressed_size,
            Some(base_version),
            CacheTier::Cache,
            started,
        ))
    })();
    let _ = std::fs::remove_file(&scratch);
    result
}

/// Per-file metadata for the commit record. Scan failures degrade to a
/// minimal entry carrying the error text.
fn scan_metadata(files: &[StagedFile]) -> BTreeMap<String, FileMeta> {
    files
        .iter()
        .map(|file| {
            let meta = match dgit_scan::scan_file(&file.absolute_path) {
                Ok(scanned) => FileMeta {
                    file_type: scanned.file_type,
                    size: file.size,
                    last_modified: file.mod_time,
                    dimensions: scanned.dimensions,
                    color_mode: scanned.color_mode,
                    version: scanned.version,
                    layers: scanned.layers,
                    layer_names: scanned.layer_names,
                    scan_error: None,
                },
                Err(err) => {
                    warn!(path = %file.path, error = %err, "metadata scan failed, recording minimal entry");
                    FileMeta {
                        file_type: file.file_type.clone(),
                        size: file.size,
                        last_modified: file.mod_time,
                        dimensions: None,
                        color_mode: None,
                        version: None,
                        layers: None,
                        layer_names: Vec::new(),
                        scan_error: Some(err.to_string()),
                    }
                },
            };
            (file.path.clone(), meta)
        })
        .collect()
}

fn pack_entries(files: &[StagedFile]) -> Vec<PackEntry> {
    files.iter().map(|f| PackEntry::new(f.path.clone(), f.absolute_path.clone())).collect()
}

fn artifact_name(path: &std::path::Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn compression_info(
    strategy: Strategy,
    output_file: String,
    original_size: u64,
    compressed_size: u64,
    base_version: Option<u64>,
    cache_level: CacheTier,
    started: Instant,
) -> CompressionInfo {
    let compression_time_ms = (started.elapsed().as_secs_f64() * 1000.0).max(f64::EPSILON);
    let compression_ratio = if original_size == 0 {
        1.0
    } else {
        compressed_size as f64 / original_size as f64
    };
    CompressionInfo {
        strategy: strategy.as_str().to_string(),
        output_file,
        original_size,
        compressed_size,
        compression_ratio,
        base_version,
        created_at: OffsetDateTime::now_utc(),
        compression_time_ms,
        cache_level,
        speed_improvement: SPEED_BASELINE_MS / compression_time_ms,
    }
}

/// Unlink the artifact a [`CompressionInfo`] points at.
fn remove_artifact(layout: &Layout, info: &CompressionInfo) {
    let dir = match info.cache_level {
        CacheTier::Versions => layout.versions_dir(),
        CacheTier::Cache => layout.cache_dir(),
    };
    let _ = std::fs::remove_file(dir.join(&info.output_file));
}
