//! Design-file metadata scanning.
//!
//! Produces the per-file metadata embedded in commit records. PSD documents
//! go through the real parser; other design formats get light-weight tagging
//! only (their containers are either zip archives or PDF-compatible streams
//! that aren't worth opening for commit metadata).

use crate::error::{ErrorKind, Result};
use crate::psd;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::instrument;

/// Extensions the strategy selector treats as design files.
pub const DESIGN_EXTENSIONS: &[&str] = &["psd", "ai", "sketch", "fig", "xd"];

/// Returns the lowercase extension of a path, if any.
#[must_use]
pub fn file_type(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Returns `true` if the path has a design-file extension.
///
/// # Examples
///
/// ```
/// use dgit_scan::is_design_file;
///
/// assert!(is_design_file("mockups/homepage.psd"));
/// assert!(is_design_file("logo.AI"));
/// assert!(!is_design_file("notes.txt"));
/// ```
#[must_use]
pub fn is_design_file(path: impl AsRef<Path>) -> bool {
    file_type(path).is_some_and(|ext| DESIGN_EXTENSIONS.contains(&ext.as_str()))
}

/// Metadata extracted from a single file for commit tracking.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignFileInfo {
    /// Lowercase extension tag (`psd`, `ai`, `png`, ...).
    #[serde(rename = "type")]
    pub file_type: String,
    /// Canvas size as `WxH`, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_mode: Option<String>,
    /// Application/format version tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub layer_names: Vec<String>,
    pub size: u64,
}

/// Scan a file for commit metadata.
///
/// # Errors
///
/// Returns [`Io`](ErrorKind::Io) if the file cannot be read, or a parse
/// error for a PSD whose header is invalid. Callers building commit records
/// are expected to degrade to a minimal metadata entry on error rather than
/// failing the commit.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn scan_file(path: impl AsRef<Path>) -> Result<DesignFileInfo> {
    let path = path.as_ref();
    let size = std::fs::metadata(path).map_err(ErrorKind::Io)?.len();
    let file_type = file_type(path).unwrap_or_default();

    let mut info = DesignFileInfo { file_type, size, ..DesignFileInfo::default() };
    match info.file_type.as_str() {
        "psd" => {
            let parsed = psd::read_info(path)?;
            info.dimensions = Some(format!("{}x{}", parsed.width, parsed.height));
            info.color_mode = Some(parsed.color_mode.as_str().to_string());
            info.version = Some("PSD".to_string());
            info.layers = Some(parsed.layer_count);
            info.layer_names = parsed.layer_names;
        },
        "ai" => {
            info.version = Some("AI".to_string());
            info.color_mode = Some("CMYK".to_string());
        },
        "sketch" => {
            info.version = Some("Sketch".to_string());
            info.color_mode = Some("RGB".to_string());
        },
        "fig" => {
            info.version = Some("Figma".to_string());
        },
        "xd" => {
            info.version = Some("XD".to_string());
        },
        _ => {},
    }
    Ok(info)
}
