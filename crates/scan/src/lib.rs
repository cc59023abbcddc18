//! Design-file inspection for DGit.
//!
//! This crate owns everything that looks *inside* a staged file:
//!
//! - A hand-rolled big-endian [PSD parser](psd) extracting document info and
//!   per-layer records (name, bounds, blend mode, opacity, visibility).
//! - [Layer-set diffing](ChangeAnalysis) between two revisions, feeding the
//!   smart-delta change manifest.
//! - [Fingerprints](fingerprint): size-adaptive file-identity hashes, layer
//!   identity hashes, and the 12-hex commit hash.
//! - Light-weight [metadata scanning](scan_file) for commit records.
//!
//! Nothing here writes to the repository; parse failures degrade to
//! synthesized placeholders wherever the caller has a documented fallback.

mod blend;
mod diff;
pub mod error;
pub mod fingerprint;
pub mod psd;
mod scanner;

pub use crate::blend::{BlendMode, LayerKind};
pub use crate::diff::{ChangeAnalysis, ChangeType, LayerChange, PropertyChanges, PropertyDelta};
pub use crate::fingerprint::{commit_hash, file_fingerprint};
pub use crate::psd::{ColorMode, DetailedLayer, DetailedPsdInfo, PsdInfo};
pub use crate::scanner::{DESIGN_EXTENSIONS, DesignFileInfo, file_type, is_design_file, scan_file};
