//! Content fingerprints and commit hashes.
//!
//! File-identity fingerprints are size-adaptive: hashing a 2 GiB Photoshop
//! document end-to-end on every `add` would dominate staging time, so large
//! files are sampled at their edges (and midpoint for the very largest). The
//! header line mixes in path, size and mod-time, which catches the
//! in-place-edit cases sampling alone would miss.

use crate::error::{ErrorKind, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Files at or below this size are hashed in full.
pub const FULL_HASH_LIMIT: u64 = 10 * 1024 * 1024;
/// Files above this size get the three-point sample.
pub const LARGE_FILE_LIMIT: u64 = 500 * 1024 * 1024;

const EDGE_SAMPLE: usize = 32 * 1024;
const LARGE_EDGE_SAMPLE: usize = 64 * 1024;
const MIDPOINT_SAMPLE: usize = 4 * 1024;

/// Compute the identity fingerprint of a file.
///
/// SHA-256 over a `path:<path>:size:<size>:modtime:<unix-seconds>:` header
/// followed by size-adaptive content:
///
/// - ≤ 10 MiB: the entire file.
/// - 10 MiB – 500 MiB: first 32 KiB + last 32 KiB.
/// - > 500 MiB: first 64 KiB + 4 KiB at the midpoint + last 64 KiB.
///
/// Returns the full hex digest.
///
/// # Errors
///
/// Returns [`Io`](ErrorKind::Io) if the file cannot be opened or read.
pub fn file_fingerprint(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(ErrorKind::Io)?;
    let meta = file.metadata().map_err(ErrorKind::Io)?;
    let size = meta.len();
    let modtime = meta
        .modified()
        .map(|t| OffsetDateTime::from(t).unix_timestamp())
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(format!("path:{}:size:{}:modtime:{}:", path.display(), size, modtime));

    if size <= FULL_HASH_LIMIT {
        std::io::copy(&mut file, &mut HashWriter(&mut hasher)).map_err(ErrorKind::Io)?;
    } else if size <= LARGE_FILE_LIMIT {
        hash_range(&mut hasher, &mut file, SeekFrom::Start(0), EDGE_SAMPLE)?;
        hash_range(&mut hasher, &mut file, SeekFrom::End(-(EDGE_SAMPLE as i64)), EDGE_SAMPLE)?;
    } else {
        hash_range(&mut hasher, &mut file, SeekFrom::Start(0), LARGE_EDGE_SAMPLE)?;
        hash_range(&mut hasher, &mut file, SeekFrom::Start(size / 2), MIDPOINT_SAMPLE)?;
        hash_range(&mut hasher, &mut file, SeekFrom::End(-(LARGE_EDGE_SAMPLE as i64)), LARGE_EDGE_SAMPLE)?;
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute a 12-hex-character commit hash.
///
/// SHA-256 over the message, the decimal version, the RFC-3339 commit
/// timestamp, and each file's absolute path, decimal size and RFC-3339
/// mod-time in staging order. Stable: identical inputs always produce the
/// identical hash.
pub fn commit_hash<'a>(
    message: &str,
    version: u64,
    timestamp: OffsetDateTime,
    files: impl IntoIterator<Item = (&'a Path, u64, OffsetDateTime)>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hasher.update(version.to_string());
    hasher.update(rfc3339(timestamp));
    for (path, size, modified) in files {
        hasher.update(path.display().to_string());
        hasher.update(size.to_string());
        hasher.update(rfc3339(modified));
    }
    hex::encode(hasher.finalize())[..12].to_string()
}

/// Compute a layer's 16-hex identity fingerprint.
///
/// Hashes the enclosing file's path and mod-time together with the layer
/// ordinal and name. Layer pixel data is deliberately excluded: extracting it
/// is expensive, and any content edit bumps the file mod-time anyway.
pub fn layer_identity(path: &Path, ordinal: usize, name: &str, modified: OffsetDateTime) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.display().to_string());
    hasher.update(format!(":{ordinal}:"));
    hasher.update(name.as_bytes());
    hasher.update(rfc3339(modified));
    hex::encode(hasher.finalize())[..16].to_string()
}

fn rfc3339(timestamp: OffsetDateTime) -> String {
    timestamp
        .replace_nanosecond(0)
        .unwrap_or(timestamp)
        .format(&Rfc3339)
        .unwrap_or_else(|_| timestamp.unix_timestamp().to_string())
}

fn hash_range(hasher: &mut Sha256, file: &mut File, from: SeekFrom, len: usize) -> Result<()> {
    file.seek(from).map_err(ErrorKind::Io)?;
    let mut buffer = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let read = file.read(&mut buffer[filled..]).map_err(ErrorKind::Io)?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    hasher.update(&buffer[..filled]);
    Ok(())
}

/// Adapter so `std::io::copy` can feed a digest.
struct HashWriter<'a>(&'a mut Sha256);

impl std::io::Write for HashWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
