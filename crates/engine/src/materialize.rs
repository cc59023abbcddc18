//! Materialization of a version's canonical record stream.
//!
//! Both the commit pipeline (to build a bsdiff base) and the restore
//! pipeline (to execute a delta chain) need "the bytes of version N" in a
//! representation-independent form. That form is the uncompressed container
//! record stream: every artifact kind decodes to it.
//!
//! The plan is computed backwards from the target version — snapshots
//! (primary, cached, optimized, legacy ZIP) and smart deltas terminate the
//! walk, bsdiff patches push a step and recurse into their base — then
//! executed forwards from the terminating base.

use crate::error::{ErrorKind, Result};
use dgit_compress::{Strategy, container, patch, smart};
use dgit_storage::{Artifact, Layout, resolve};
use exn::{OptionExt, ResultExt};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Produce the record stream for `version` as in-memory bytes.
pub fn record_stream(layout: &Layout, version: u64) -> Result<Vec<u8>> {
    let (base, patches) = plan(layout, version)?;
    let mut stream = base_stream(&base)?;
    for step in &patches {
        debug!(version = step.version, patch = %step.path.display(), "applying binary patch");
        let patch_bytes = std::fs::read(&step.path).map_err(ErrorKind::Io)?;
        stream = patch::apply(&stream, &patch_bytes).or_raise(|| ErrorKind::Restore(step.version))?;
    }
    Ok(stream)
}

/// Extract one file's bytes from `version` by relative path or basename.
pub fn extract_file(layout: &Layout, version: u64, wanted: &str) -> Result<Option<Vec<u8>>> {
    let stream = record_stream(layout, version)?;
    container::extract_record(stream.as_slice(), wanted).or_raise(|| ErrorKind::Restore(version))
}

/// Compute the restoration plan: the self-contained base artifact plus the
/// bsdiff patches to apply on top, oldest first.
pub fn plan(layout: &Layout, version: u64) -> Result<(Artifact, Vec<Artifact>)> {
    let mut patches = Vec::new();
    let mut current = version;
    loop {
        let artifact = resolve(layout, current).ok_or_raise(|| ErrorKind::Restore(version))?;
        match artifact.base_version {
            None => {
                patches.reverse();
                return Ok((artifact, patches));
            },
            Some(base) => {
                patches.push(artifact);
                current = base;
            },
        }
    }
}

/// Decode a self-contained artifact into its record stream.
fn base_stream(artifact: &Artifact) -> Result<Vec<u8>> {
    match artifact.strategy {
        Strategy::Lz4 | Strategy::Zstd => {
            let mut reader =
                container::open_artifact(&artifact.path).or_raise(|| ErrorKind::Restore(artifact.version))?;
            let mut stream = Vec::new();
            reader.read_to_end(&mut stream).map_err(ErrorKind::Io)?;
            Ok(stream)
        },
        Strategy::PsdSmart => {
            let (manifest, content) =
                smart::apply_to_vec(&artifact.path).or_raise(|| ErrorKind::Restore(artifact.version))?;
            let mut stream = Vec::new();
            container::write_record(&mut stream, &manifest.file_path, &content)
                .or_raise(|| ErrorKind::Restore(artifact.version))?;
            Ok(stream)
        },
        Strategy::Zip => zip_stream(&artifact.path, artifact.version),
        Strategy::Bsdiff => {
            // resolve() never returns a bsdiff artifact without a base.
            exn::bail!(ErrorKind::Restore(artifact.version));
        },
    }
}

/// Convert a legacy ZIP snapshot into the record-stream form.
fn zip_stream(path: &Path, version: u64) -> Result<Vec<u8>> {
    let file = std::fs::File::open(path).map_err(ErrorKind::Io)?;
    let mut archive = zip::ZipArchive::new(file).or_raise(|| ErrorKind::Restore(version))?;
    let mut stream = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).or_raise(|| ErrorKind::Restore(version))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().replace('\\', "/");
        let mut content = Vec::new();
        entry.read_to_end(&mut content).map_err(ErrorKind::Io)?;
        container::write_record(&mut stream, &name, &content).or_raise(|| ErrorKind::Restore(version))?;
    }
    Ok(stream)
}
