//! Snapshot re-encoding for the background optimizer.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use lz4_flex::frame::FrameDecoder;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use tracing::instrument;

/// Re-encode an LZ4 snapshot as Zstd at the default level.
///
/// The output decodes to the identical record stream; only the outer frame
/// changes. Streaming end to end, so memory use is bounded regardless of
/// snapshot size. The partial output is removed on error; the source is
/// never touched.
#[instrument(skip_all, fields(src = %src.display(), dst = %dst.display()))]
pub fn lz4_to_zstd(src: &Path, dst: &Path) -> Result<u64> {
    let result = (|| -> Result<u64> {
        let source = File::open(src).map_err(ErrorKind::Io)?;
        let target = File::create(dst).map_err(ErrorKind::Io)?;
        let mut decoder = FrameDecoder::new(source);
        let encoder = zstd::stream::write::Encoder::new(BufWriter::new(target), 0)
            .or_raise(|| ErrorKind::Encoder)?;
        let mut encoder = encoder.auto_finish();
        let copied = io::copy(&mut decoder, &mut encoder)
            .or_raise(|| ErrorKind::CorruptArtifact("source is not a valid LZ4 frame".to_string()))?;
        Ok(copied)
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(dst);
    }
    result
}
