//! Binary-patch delta codec.
//!
//! Patches are standard bsdiff 4.x: suffix-sorted matching of the base,
//! encoded as control triples plus compressed diff/extra streams. Both sides
//! of a patch are canonical container record streams (see
//! [`container`](crate::container)), never the LZ4-compressed artifact
//! bytes — LZ4 output is not byte-stable across encoders, the record stream
//! is.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use qbsdiff::{Bsdiff, Bspatch};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::instrument;

/// Compute a patch transforming `base` into `target`, written to `out`.
///
/// Returns the patch size in bytes. The partial patch file is removed on
/// error.
#[instrument(skip_all, fields(base = base.len(), target = target.len(), out = %out.display()))]
pub fn diff(base: &[u8], target: &[u8], out: &Path) -> Result<u64> {
    let result = (|| -> Result<u64> {
        let file = File::create(out).map_err(ErrorKind::Io)?;
        Bsdiff::new(base, target)
            .compare(BufWriter::new(file))
            .map_err(ErrorKind::Io)?;
        Ok(std::fs::metadata(out).map_err(ErrorKind::Io)?.len())
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(out);
    }
    result
}

/// Apply a patch to `base`, reproducing the original target bytes.
///
/// Deterministic: requires only the base and the patch.
///
/// # Errors
///
/// Raises [`CorruptArtifact`](ErrorKind::CorruptArtifact) when the patch
/// envelope is invalid or does not apply to this base.
#[instrument(skip_all, fields(base = base.len(), patch = patch.len()))]
pub fn apply(base: &[u8], patch: &[u8]) -> Result<Vec<u8>> {
    let patcher = Bspatch::new(patch).or_raise(|| ErrorKind::CorruptArtifact("invalid bsdiff envelope".to_string()))?;
    let mut target = Vec::with_capacity(usize::try_from(patcher.hint_target_size()).unwrap_or(0));
    patcher
        .apply(base, &mut target)
        .or_raise(|| ErrorKind::CorruptArtifact("bsdiff patch does not apply".to_string()))?;
    Ok(target)
}
