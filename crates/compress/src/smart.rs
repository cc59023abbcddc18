//! PSD smart-delta codec.
//!
//! A smart delta records *what changed* between two revisions of a Photoshop
//! document (a JSON layer-change manifest) alongside an LZ4-compressed copy
//! of the new file. Applying one simply decompresses the embedded copy; the
//! manifest is informational and is never replayed. The format trades
//! cross-version byte economy for robustness: layer byte-content cannot yet
//! be faithfully recomposed, so the full payload rides along. Keep the
//! manifest shape stable — a future layer-level replay depends on it.
//!
//! On-disk layout:
//!
//! ```text
//! PSD_SMART_DELTA_V1\n
//! METADATA_LENGTH:<N>\n
//! <N bytes of UTF-8 JSON manifest>
//! \nBINARY_DATA:\n
//! <LZ4 frame of the new PSD>
//! ```

use crate::error::{ErrorKind, Result};
use dgit_scan::ChangeAnalysis;
use exn::{OptionExt, ResultExt};
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use time::OffsetDateTime;
use tracing::instrument;

const HEADER: &[u8] = b"PSD_SMART_DELTA_V1\n";
const METADATA_LENGTH_PREFIX: &[u8] = b"METADATA_LENGTH:";
const BINARY_MARKER: &[u8] = b"\nBINARY_DATA:\n";

/// The JSON change manifest embedded in a smart-delta file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmartDeltaManifest {
    /// Always `"psd_smart_delta"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub from_version: u64,
    pub to_version: u64,
    /// Relative path of the document inside the repository.
    pub file_path: String,
    /// Byte length of the new document; equals the decompressed payload
    /// length by construction, validated on apply.
    pub original_size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub layer_analysis: ChangeAnalysis,
}

impl SmartDeltaManifest {
    pub fn new(
        from_version: u64,
        to_version: u64,
        file_path: impl Into<String>,
        original_size: u64,
        layer_analysis: ChangeAnalysis,
    ) -> Self {
        Self {
            kind: "psd_smart_delta".to_string(),
            from_version,
            to_version,
            file_path: file_path.into(),
            original_size,
            timestamp: OffsetDateTime::now_utc(),
            layer_analysis,
        }
    }
}

/// Encode a smart delta for `new_psd` at `out`.
///
/// Returns the delta file size. The partial file is removed on error.
#[instrument(skip_all, fields(out = %out.display(), from = manifest.from_version, to = manifest.to_version))]
pub fn encode(manifest: &SmartDeltaManifest, new_psd: &Path, out: &Path) -> Result<u64> {
    let result = encode_inner(manifest, new_psd, out);
    if result.is_err() {
        let _ = std::fs::remove_file(out);
    }
    result
}

fn encode_inner(manifest: &SmartDeltaManifest, new_psd: &Path, out: &Path) -> Result<u64> {
    let manifest_bytes = serde_json::to_vec_pretty(manifest)
        .or_raise(|| ErrorKind::CorruptArtifact("manifest serialization failed".to_string()))?;

    let mut writer = BufWriter::new(File::create(out).map_err(ErrorKind::Io)?);
    writer.write_all(HEADER).map_err(ErrorKind::Io)?;
    writer.write_all(METADATA_LENGTH_PREFIX).map_err(ErrorKind::Io)?;
    writeln!(writer, "{}", manifest_bytes.len()).map_err(ErrorKind::Io)?;
    writer.write_all(&manifest_bytes).map_err(ErrorKind::Io)?;
    writer.write_all(BINARY_MARKER).map_err(ErrorKind::Io)?;

    let mut source = File::open(new_psd).map_err(ErrorKind::Io)?;
    let mut encoder = FrameEncoder::new(writer);
    io::copy(&mut source, &mut encoder).map_err(ErrorKind::Io)?;
    let mut writer = encoder.finish().or_raise(|| ErrorKind::Encoder)?;
    writer.flush().map_err(ErrorKind::Io)?;

    Ok(std::fs::metadata(out).map_err(ErrorKind::Io)?.len())
}

/// Apply a smart delta: decompress the embedded document to `out`.
///
/// Returns the manifest for reporting. The manifest's layer analysis is not
/// replayed.
///
/// # Errors
///
/// Raises [`CorruptArtifact`](ErrorKind::CorruptArtifact) when the envelope
/// is malformed or the payload length does not match the manifest's
/// `original_size`.
#[instrument(skip_all, fields(delta = %delta.display(), out = %out.display()))]
pub fn apply(delta: &Path, out: &Path) -> Result<SmartDeltaManifest> {
    let bytes = std::fs::read(delta).map_err(ErrorKind::Io)?;
    let (manifest, payload) = split(&bytes)?;

    let mut decoder = FrameDecoder::new(payload);
    let mut target = BufWriter::new(File::create(out).map_err(ErrorKind::Io)?);
    let written = io::copy(&mut decoder, &mut target)
        .or_raise(|| ErrorKind::CorruptArtifact("smart-delta payload is not a valid LZ4 frame".to_string()))?;
    target.flush().map_err(ErrorKind::Io)?;

    if written != manifest.original_size {
        let _ = std::fs::remove_file(out);
        exn::bail!(ErrorKind::CorruptArtifact(format!(
            "smart-delta payload decompressed to {written} bytes, manifest declares {}",
            manifest.original_size,
        )));
    }
    Ok(manifest)
}

/// Apply a smart delta into memory, returning the manifest and document bytes.
pub fn apply_to_vec(delta: &Path) -> Result<(SmartDeltaManifest, Vec<u8>)> {
    let bytes = std::fs::read(delta).map_err(ErrorKind::Io)?;
    let (manifest, payload) = split(&bytes)?;
    let mut decoder = FrameDecoder::new(payload);
    let mut content = Vec::new();
    io::copy(&mut decoder, &mut content)
        .or_raise(|| ErrorKind::CorruptArtifact("smart-delta payload is not a valid LZ4 frame".to_string()))?;
    if content.len() as u64 != manifest.original_size {
        exn::bail!(ErrorKind::CorruptArtifact(format!(
            "smart-delta payload decompressed to {} bytes, manifest declares {}",
            content.len(),
            manifest.original_size,
        )));
    }
    Ok((manifest, content))
}

/// Read only the manifest, without touching the payload.
pub fn read_manifest(delta: &Path) -> Result<SmartDeltaManifest> {
    let bytes = std::fs::read(delta).map_err(ErrorKind::Io)?;
    let (manifest, _) = split(&bytes)?;
    Ok(manifest)
}

/// Validate the envelope and split it into (manifest, compressed payload).
fn split(bytes: &[u8]) -> Result<(SmartDeltaManifest, &[u8])> {
    let rest = bytes
        .strip_prefix(HEADER)
        .ok_or_raise(|| ErrorKind::CorruptArtifact("missing smart-delta header".to_string()))?;
    let line_end = rest
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_raise(|| ErrorKind::CorruptArtifact("missing metadata length line".to_string()))?;
    let metadata_len: usize = rest[..line_end]
        .strip_prefix(METADATA_LENGTH_PREFIX)
        .and_then(|digits| std::str::from_utf8(digits).ok())
        .and_then(|digits| digits.parse().ok())
        .ok_or_raise(|| ErrorKind::CorruptArtifact("invalid metadata length line".to_string()))?;

    let manifest_start = line_end + 1;
    let manifest_end = manifest_start
        .checked_add(metadata_len)
        .filter(|&end| end <= rest.len())
        .ok_or_raise(|| ErrorKind::CorruptArtifact("metadata length exceeds file size".to_string()))?;
    let manifest: SmartDeltaManifest = serde_json::from_slice(&rest[manifest_start..manifest_end])
        .or_raise(|| ErrorKind::CorruptArtifact("invalid manifest JSON".to_string()))?;

    let payload = rest[manifest_end..]
        .strip_prefix(BINARY_MARKER)
        .ok_or_raise(|| ErrorKind::CorruptArtifact("binary data marker not found".to_string()))?;
    Ok((manifest, payload))
}
