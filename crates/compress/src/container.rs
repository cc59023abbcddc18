//! LZ4 container codec.
//!
//! A container is a sequence of records — an ASCII header line
//! `FILE:<relative-path>:<byte-count>\n` followed by exactly that many raw
//! bytes — wrapped in a single LZ4 frame at the fastest level. The
//! *uncompressed* record stream is the canonical byte form of a version:
//! binary patches are computed over it, and the Zstd optimizer re-wraps it,
//! so every representation of a version decodes to the identical stream.
//!
//! Decoding is streaming: records are skipped or copied as the frame is
//! read, so restoring a single file from a multi-gigabyte snapshot never
//! buffers the other entries.

use crate::Strategy;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{instrument, warn};

const HEADER_PREFIX: &[u8] = b"FILE:";
const MAX_HEADER_LINE: usize = 4096;

/// One file to be packed into a container.
#[derive(Clone, Debug)]
pub struct PackEntry {
    /// Relative path recorded in the header line.
    pub path: String,
    /// Where to read the bytes from.
    pub source: PathBuf,
}

impl PackEntry {
    pub fn new(path: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), source: source.into() }
    }
}

/// Sizes observed while packing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PackStats {
    pub original_size: u64,
    pub compressed_size: u64,
}

impl PackStats {
    /// `compressed / original`; 1.0 for an empty input.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            1.0
        } else {
            self.compressed_size as f64 / self.original_size as f64
        }
    }
}

/// Outcome of a bulk or filtered unpack.
#[derive(Debug, Default)]
pub struct UnpackSummary {
    /// Entry paths written out, in container order.
    pub restored: Vec<String>,
    /// Entries present but excluded by the filter.
    pub skipped: Vec<String>,
    /// Entries that matched but could not be written, with the reason.
    pub errored: Vec<(String, String)>,
}

/// A parsed record header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    pub path: String,
    pub size: u64,
}

/// Pack `entries` into an LZ4 container at `out`.
///
/// Entries are written in input order. If the resulting ratio exceeds
/// `ratio_limit` the artifact is deleted and
/// [`IneffectiveCompression`](ErrorKind::IneffectiveCompression) is raised
/// (a ratio exactly at the limit is accepted). On any error the partial
/// artifact is removed.
#[instrument(skip(entries), fields(entries = entries.len(), out = %out.display()))]
pub fn pack(entries: &[PackEntry], out: &Path, ratio_limit: f64) -> Result<PackStats> {
    let stats = pack_compressed(entries, out).inspect_err(|_| {
        let _ = std::fs::remove_file(out);
    })?;
    if stats.ratio() > ratio_limit {
        let _ = std::fs::remove_file(out);
        exn::bail!(ErrorKind::IneffectiveCompression { ratio: stats.ratio(), limit: ratio_limit });
    }
    Ok(stats)
}

fn pack_compressed(entries: &[PackEntry], out: &Path) -> Result<PackStats> {
    let file = File::create(out).map_err(ErrorKind::Io)?;
    let mut encoder = FrameEncoder::new(file);
    let original_size = write_records(entries, &mut encoder)?;
    encoder.finish().or_raise(|| ErrorKind::Encoder)?;
    let compressed_size = std::fs::metadata(out).map_err(ErrorKind::Io)?.len();
    Ok(PackStats { original_size, compressed_size })
}

/// Write the raw (uncompressed) record stream for `entries` into `writer`.
///
/// Returns the total number of content bytes. This is the canonical stream
/// used as a bsdiff base/target.
pub fn write_records<W: Write>(entries: &[PackEntry], writer: &mut W) -> Result<u64> {
    let mut original_size = 0u64;
    for entry in entries {
        let content = std::fs::read(&entry.source).map_err(ErrorKind::Io)?;
        write_record(writer, &entry.path, &content)?;
        original_size += content.len() as u64;
    }
    Ok(original_size)
}

/// Write a single record (header line + content).
pub fn write_record<W: Write>(writer: &mut W, path: &str, content: &[u8]) -> Result<()> {
    writeln!(writer, "FILE:{}:{}", path, content.len()).map_err(ErrorKind::Io)?;
    writer.write_all(content).map_err(ErrorKind::Io)?;
    Ok(())
}

/// Unpack records from a decompressed record stream.
///
/// Entries whose path satisfies `filter` are written below `dest_root`
/// (parent directories created); the rest are skipped without buffering.
/// Per-entry write failures are collected in the summary; a truncated record
/// is fatal.
pub fn unpack_stream<R: Read>(reader: R, dest_root: &Path, filter: impl Fn(&str) -> bool) -> Result<UnpackSummary> {
    let mut reader = BufReader::new(reader);
    let mut summary = UnpackSummary::default();
    while let Some(header) = read_header(&mut reader)? {
        if !filter(&header.path) {
            skip_bytes(&mut reader, header.size)?;
            summary.skipped.push(header.path);
            continue;
        }
        let Some(relative) = sanitize_relative(&header.path) else {
            warn!(path = %header.path, "refusing to restore entry with unsafe path");
            summary.errored.push((header.path.clone(), "unsafe path".to_string()));
            skip_bytes(&mut reader, header.size)?;
            continue;
        };
        let target = dest_root.join(relative);
        if let Some(parent) = target.parent()
            && let Err(err) = std::fs::create_dir_all(parent)
        {
            summary.errored.push((header.path.clone(), err.to_string()));
            skip_bytes(&mut reader, header.size)?;
            continue;
        }
        let mut out = match File::create(&target) {
            Ok(file) => file,
            Err(err) => {
                summary.errored.push((header.path.clone(), err.to_string()));
                skip_bytes(&mut reader, header.size)?;
                continue;
            },
        };
        let copied = io::copy(&mut reader.by_ref().take(header.size), &mut out).map_err(ErrorKind::Io)?;
        if copied != header.size {
            exn::bail!(ErrorKind::CorruptArtifact(format!(
                "record for {} truncated: expected {} bytes, got {copied}",
                header.path, header.size,
            )));
        }
        summary.restored.push(header.path);
    }
    Ok(summary)
}

/// Find a single record by exact relative path or basename and return its
/// content, streaming past everything else.
pub fn extract_record<R: Read>(reader: R, wanted: &str) -> Result<Option<Vec<u8>>> {
    let wanted_name = basename(wanted);
    let mut reader = BufReader::new(reader);
    while let Some(header) = read_header(&mut reader)? {
        if header.path == wanted || basename(&header.path) == wanted_name {
            let mut content = Vec::with_capacity(usize::try_from(header.size).unwrap_or(0));
            let copied = io::copy(&mut reader.by_ref().take(header.size), &mut content).map_err(ErrorKind::Io)?;
            if copied != header.size {
                exn::bail!(ErrorKind::CorruptArtifact(format!(
                    "record for {} truncated: expected {} bytes, got {copied}",
                    header.path, header.size,
                )));
            }
            return Ok(Some(content));
        }
        skip_bytes(&mut reader, header.size)?;
    }
    Ok(None)
}

/// List record headers without extracting content.
pub fn list_records<R: Read>(reader: R) -> Result<Vec<RecordHeader>> {
    let mut reader = BufReader::new(reader);
    let mut headers = Vec::new();
    while let Some(header) = read_header(&mut reader)? {
        skip_bytes(&mut reader, header.size)?;
        headers.push(header);
    }
    Ok(headers)
}

/// Open a stored artifact as its decompressed record stream.
///
/// The strategy is detected from the artifact's extension; only snapshot
/// formats (`.lz4`, `.zstd`) are streamable.
pub fn open_artifact(path: &Path) -> Result<Box<dyn Read>> {
    let strategy = Strategy::from_path(path)
        .ok_or_raise(|| ErrorKind::UnsupportedStrategy(path.display().to_string()))?;
    let file = File::open(path).map_err(ErrorKind::Io)?;
    strategy.wrap_reader(file)
}

impl Strategy {
    /// Wrap a reader over an artifact's bytes with the decompression layer
    /// for this strategy.
    ///
    /// # Errors
    ///
    /// Raises [`NotStreamable`](ErrorKind::NotStreamable) for delta and
    /// legacy strategies, which do not decode as a plain byte stream.
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Strategy::Lz4 => Box::new(FrameDecoder::new(reader)),
            Strategy::Zstd => Box::new(zstd::stream::read::Decoder::new(reader).or_raise(|| ErrorKind::Encoder)?),
            Strategy::PsdSmart | Strategy::Bsdiff | Strategy::Zip => {
                exn::bail!(ErrorKind::NotStreamable(self.as_str()))
            },
        })
    }
}

fn read_header<R: BufRead>(reader: &mut R) -> Result<Option<RecordHeader>> {
    loop {
        let mut line = Vec::new();
        let read = reader
            .by_ref()
            .take(MAX_HEADER_LINE as u64)
            .read_until(b'\n', &mut line)
            .map_err(ErrorKind::Io)?;
        if read == 0 {
            return Ok(None);
        }
        if line.last() != Some(&b'\n') {
            exn::bail!(ErrorKind::CorruptArtifact("unterminated record header".to_string()));
        }
        line.pop();
        if !line.starts_with(HEADER_PREFIX) {
            // Tolerate stray lines between records.
            continue;
        }
        let header = std::str::from_utf8(&line[HEADER_PREFIX.len()..])
            .ok()
            .and_then(|rest| rest.rsplit_once(':'))
            .and_then(|(path, size)| size.parse::<u64>().ok().map(|size| (path, size)));
        let Some((path, size)) = header else {
            exn::bail!(ErrorKind::CorruptArtifact(format!(
                "malformed record header: {}",
                String::from_utf8_lossy(&line),
            )));
        };
        return Ok(Some(RecordHeader { path: path.to_string(), size }));
    }
}

fn skip_bytes<R: Read>(reader: &mut R, n: u64) -> Result<()> {
    let copied = io::copy(&mut reader.take(n), &mut io::sink()).map_err(ErrorKind::Io)?;
    if copied != n {
        exn::bail!(ErrorKind::CorruptArtifact(format!("record truncated: expected {n} bytes, got {copied}")));
    }
    Ok(())
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Normalize an entry path for writing below a destination root.
///
/// Rejects absolute paths, traversal above the root, and null bytes.
#[must_use]
pub fn sanitize_relative(path: &str) -> Option<PathBuf> {
    if path.contains('\0') {
        return None;
    }
    let mut components = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => components.push(part),
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) => return None,
            Component::ParentDir => {
                components.pop()?;
            },
        }
    }
    (!components.is_empty()).then(|| components.into_iter().collect())
}
