//! Photoshop document parsing.
//!
//! PSD is a big-endian container: a fixed 26-byte header, three
//! length-prefixed sections (color-mode data, image resources, layer/mask
//! info), then composite image data. This parser reads the header and walks
//! the layer records; it never touches pixel data.
//!
//! Two depths are offered:
//!
//! - [`read_info`] — document dimensions, channel/depth/color-mode info and
//!   ordered layer names.
//! - [`read_detailed`] — additionally, per-layer bounds, blend mode, opacity,
//!   visibility, a coarse [`LayerKind`](crate::LayerKind) and a stable
//!   content fingerprint used for change detection between revisions.
//!
//! Version 2 documents share the `8BPS` signature with PSB but PSB widens
//! several length fields to 8 bytes; such a file fails layer parsing here and
//! degrades to synthesized layer names rather than being rejected outright.

use crate::blend::{BlendMode, LayerKind};
use crate::error::{ErrorKind, Result};
use crate::fingerprint;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{instrument, warn};

const SIGNATURE: [u8; 4] = *b"8BPS";
const BLEND_SIGNATURE: [u8; 4] = *b"8BIM";
const EXTENDED_SIGNATURE: [u8; 4] = *b"8B64";
const UNICODE_NAME_KEY: [u8; 4] = *b"luni";
const UTF16_BOM: u16 = 0xFEFF;

/// Document color mode from the file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Bitmap,
    Grayscale,
    Indexed,
    Rgb,
    Cmyk,
    Multichannel,
    Duotone,
    Lab,
    Unknown,
}

impl ColorMode {
    #[must_use]
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => Self::Bitmap,
            1 => Self::Grayscale,
            2 => Self::Indexed,
            3 => Self::Rgb,
            4 => Self::Cmyk,
            7 => Self::Multichannel,
            8 => Self::Duotone,
            9 => Self::Lab,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bitmap => "Bitmap",
            Self::Grayscale => "Grayscale",
            Self::Indexed => "Indexed",
            Self::Rgb => "RGB",
            Self::Cmyk => "CMYK",
            Self::Multichannel => "Multichannel",
            Self::Duotone => "Duotone",
            Self::Lab => "Lab",
            Self::Unknown => "Unknown",
        }
    }
}

/// Basic document information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PsdInfo {
    /// Document width in pixels.
    pub width: u32,
    /// Document height in pixels.
    pub height: u32,
    /// Number of color channels.
    pub channels: u16,
    /// Bit depth per channel.
    pub depth: u16,
    /// Document color mode.
    pub color_mode: ColorMode,
    /// Total number of layers. Zero for flattened documents.
    pub layer_count: usize,
    /// Layer names in record order. Synthesized (`Layer 1..N`) when the
    /// layer records could not be parsed.
    pub layer_names: Vec<String>,
}

/// A fully parsed layer record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedLayer {
    /// Ordinal of the layer record within the document.
    pub id: usize,
    /// Layer name; the Unicode (`luni`) name when present, otherwise the
    /// Pascal-string name.
    pub name: String,
    /// Layer bounds: top, left, bottom, right.
    pub bounds: [i32; 4],
    pub blend_mode: BlendMode,
    /// Layer opacity, 0-255.
    pub opacity: u8,
    pub visible: bool,
    /// Stable identity fingerprint (16 hex chars) used for change detection.
    ///
    /// Derived from the enclosing file's path and mod-time plus the layer's
    /// ordinal and name; layer pixel content is deliberately not hashed.
    pub content_hash: String,
    pub kind: LayerKind,
}

/// Basic info plus every parsed layer record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailedPsdInfo {
    pub info: PsdInfo,
    pub layers: Vec<DetailedLayer>,
}

/// Read basic document info: dimensions, channels, depth, color mode and
/// ordered layer names.
///
/// Layer-record corruption degrades to synthesized `Layer 1..N` names; header
/// corruption is an error.
///
/// # Errors
///
/// Returns [`NotPsd`](ErrorKind::NotPsd) for a bad signature,
/// [`UnsupportedVersion`](ErrorKind::UnsupportedVersion) for versions other
/// than 1 or 2, and [`Truncated`](ErrorKind::Truncated)/[`Io`](ErrorKind::Io)
/// for short or unreadable files.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_info(path: impl AsRef<Path>) -> Result<PsdInfo> {
    let detailed = read_detailed(path)?;
    Ok(detailed.info)
}

/// Read the document with full per-layer records.
///
/// Any single layer record that fails to parse yields a placeholder layer
/// with safe defaults; parsing does not resume past the first corrupt record
/// (the stream position is unrecoverable), so all subsequent layers are
/// placeholders too.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_detailed(path: impl AsRef<Path>) -> Result<DetailedPsdInfo> {
    let path = path.as_ref();
    let mut parser = Parser::open(path)?;
    let header = parser.header()?;
    let layer_count = parser.layer_count()?;

    let mut layers = Vec::with_capacity(layer_count);
    let mut corrupt = false;
    for ordinal in 0..layer_count {
        if corrupt {
            layers.push(parser.placeholder(ordinal));
            continue;
        }
        match parser.layer(ordinal) {
            Ok(layer) => layers.push(layer),
            Err(err) => {
                warn!(ordinal, error = %err, "layer record parse failed, substituting placeholder");
                corrupt = true;
                layers.push(parser.placeholder(ordinal));
            },
        }
    }

    let info = PsdInfo {
        width: header.width,
        height: header.height,
        channels: header.channels,
        depth: header.depth,
        color_mode: ColorMode::from_raw(header.color_mode),
        layer_count,
        layer_names: layers.iter().map(|l| l.name.clone()).collect(),
    };
    Ok(DetailedPsdInfo { info, layers })
}

struct Header {
    channels: u16,
    height: u32,
    width: u32,
    depth: u16,
    color_mode: u16,
}

struct Parser {
    reader: BufReader<File>,
    path: PathBuf,
    modified: OffsetDateTime,
}

impl Parser {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(ErrorKind::Io)?;
        let modified = file
            .metadata()
            .and_then(|meta| meta.modified())
            .map(OffsetDateTime::from)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        Ok(Self {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
            modified,
        })
    }

    /// Parse and validate the fixed 26-byte file header.
    fn header(&mut self) -> Result<Header> {
        let signature: [u8; 4] = self.read_array("signature")?;
        if signature != SIGNATURE {
            exn::bail!(ErrorKind::NotPsd(signature));
        }
        let version = self.read_u16("version")?;
        if version != 1 && version != 2 {
            exn::bail!(ErrorKind::UnsupportedVersion(version));
        }
        self.skip(6, "reserved bytes")?;
        let channels = self.read_u16("channel count")?;
        let height = self.read_u32("height")?;
        let width = self.read_u32("width")?;
        let depth = self.read_u16("bit depth")?;
        let color_mode = self.read_u16("color mode")?;
        Ok(Header { channels, height, width, depth, color_mode })
    }

    /// Skip to the layer records and return the layer count.
    ///
    /// Must be called immediately after [`header`](Self::header). Leaves the
    /// stream positioned at the first layer record.
    fn layer_count(&mut self) -> Result<usize> {
        let color_mode_len = self.read_u32("color mode data length")?;
        self.skip(u64::from(color_mode_len), "color mode data")?;
        let resources_len = self.read_u32("image resources length")?;
        self.skip(u64::from(resources_len), "image resources")?;

        let layer_mask_len = self.read_u32("layer and mask info length")?;
        if layer_mask_len == 0 {
            // Flattened document.
            return Ok(0);
        }
        let layer_info_len = self.read_u32("layer info length")?;
        if layer_info_len == 0 {
            return Ok(0);
        }
        let raw_count = self.read_i16("layer count")?;
        // A negative count means the first alpha channel holds the merged
        // transparency; the magnitude is the real layer count.
        Ok(raw_count.unsigned_abs().into())
    }

    /// Parse a single layer record, leaving the stream at the next record.
    fn layer(&mut self, ordinal: usize) -> Result<DetailedLayer> {
        let bounds = [
            self.read_i32("layer top")?,
            self.read_i32("layer left")?,
            self.read_i32("layer bottom")?,
            self.read_i32("layer right")?,
        ];
        let channels = self.read_u16("layer channel count")?;
        // Channel info is 6 bytes per channel: 2-byte id + 4-byte data length.
        self.skip(u64::from(channels) * 6, "channel info")?;

        let blend_signature: [u8; 4] = self.read_array("blend signature")?;
        if blend_signature != BLEND_SIGNATURE {
            exn::bail!(ErrorKind::Malformed("blend mode signature"));
        }
        let blend_key: [u8; 4] = self.read_array("blend mode key")?;
        let blend_mode = BlendMode::from_key(blend_key);

        // Flag bytes: opacity, clipping, flags, filler.
        let flags: [u8; 4] = self.read_array("layer flags")?;
        let opacity = flags[0];
        let visible = (flags[2] & 0x02) == 0;

        let extra_len = self.read_u32("extra data length")? as usize;
        let mut extra = vec![0u8; extra_len];
        self.reader.read_exact(&mut extra).or_raise(|| ErrorKind::Truncated("layer extra data"))?;

        let name = layer_name(&extra).unwrap_or_else(|| format!("Layer {}", ordinal + 1));
        let content_hash = fingerprint::layer_identity(&self.path, ordinal, &name, self.modified);
        let kind = LayerKind::classify(&name, blend_mode);
        Ok(DetailedLayer {
            id: ordinal,
            name,
            bounds,
            blend_mode,
            opacity,
            visible,
            content_hash,
            kind,
        })
    }

    /// Safe-default record for a layer whose bytes could not be parsed.
    fn placeholder(&self, ordinal: usize) -> DetailedLayer {
        let name = format!("Layer {}", ordinal + 1);
        let content_hash = fingerprint::layer_identity(&self.path, ordinal, &name, self.modified);
        DetailedLayer {
            id: ordinal,
            name,
            bounds: [0, 0, 100, 100],
            blend_mode: BlendMode::Normal,
            opacity: 255,
            visible: true,
            content_hash,
            kind: LayerKind::Normal,
        }
    }

    fn read_array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.reader.read_exact(&mut buf).or_raise(|| ErrorKind::Truncated(what))?;
        Ok(buf)
    }

    fn read_u16(&mut self, what: &'static str) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array(what)?))
    }

    fn read_i16(&mut self, what: &'static str) -> Result<i16> {
        Ok(i16::from_be_bytes(self.read_array(what)?))
    }

    fn read_u32(&mut self, what: &'static str) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array(what)?))
    }

    fn read_i32(&mut self, what: &'static str) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array(what)?))
    }

    fn skip(&mut self, n: u64, what: &'static str) -> Result<()> {
        let copied = std::io::copy(&mut self.reader.by_ref().take(n), &mut std::io::sink())
            .or_raise(|| ErrorKind::Truncated(what))?;
        if copied != n {
            exn::bail!(ErrorKind::Truncated(what));
        }
        Ok(())
    }
}

/// Extract the layer name from a layer record's extra-data block.
///
/// The block holds length-prefixed mask data and blending ranges, then a
/// Pascal-string name padded to a 4-byte boundary (padding includes the
/// length byte), then optional "Additional Layer Information" blocks. A
/// `luni` block carries the authoritative UTF-16 name and is preferred over
/// the Pascal string.
fn layer_name(extra: &[u8]) -> Option<String> {
    let mut pos = 0usize;

    let mask_len = read_be_u32(extra, pos)? as usize;
    pos = pos.checked_add(4 + mask_len)?;
    let ranges_len = read_be_u32(extra, pos)? as usize;
    pos = pos.checked_add(4 + ranges_len)?;

    let name_len = *extra.get(pos)? as usize;
    let name_bytes = extra.get(pos + 1..pos + 1 + name_len)?;
    let pascal = String::from_utf8_lossy(name_bytes).into_owned();
    // Pascal string is padded to a multiple of 4, counting the length byte.
    pos = pos.checked_add((1 + name_len + 3) & !3)?;

    if let Some(rest) = extra.get(pos..)
        && let Some(unicode) = unicode_layer_name(rest)
    {
        return Some(unicode);
    }
    (!pascal.is_empty()).then_some(pascal)
}

/// Scan additional-layer-information blocks for a `luni` (Unicode name) entry.
///
/// Blocks are 2-byte aligned; a byte-wise sliding search tolerates the
/// unaligned padding some writers emit between blocks.
fn unicode_layer_name(buf: &[u8]) -> Option<String> {
    let mut pos = 0usize;
    while pos + 12 <= buf.len() {
        let signature = &buf[pos..pos + 4];
        if signature != EXTENDED_SIGNATURE && signature != BLEND_SIGNATURE {
            pos += 1;
            continue;
        }
        let key = &buf[pos + 4..pos + 8];
        let data_len = read_be_u32(buf, pos + 8)? as usize;
        let data_start = pos + 12;

        if key == UNICODE_NAME_KEY {
            let unit_count = read_be_u32(buf, data_start)? as usize;
            let mut units = Vec::with_capacity(unit_count);
            for i in 0..unit_count {
                let offset = data_start + 4 + i * 2;
                let unit = u16::from_be_bytes([*buf.get(offset)?, *buf.get(offset + 1)?]);
                units.push(unit);
            }
            if units.first() == Some(&UTF16_BOM) {
                units.remove(0);
            }
            while units.last() == Some(&0) {
                units.pop();
            }
            let name = String::from_utf16_lossy(&units);
            return (!name.is_empty()).then_some(name);
        }

        // Blocks are padded to even length.
        pos = data_start.checked_add(data_len + (data_len & 1))?;
    }
    None
}

fn read_be_u32(buf: &[u8], pos: usize) -> Option<u32> {
    let bytes: [u8; 4] = buf.get(pos..pos + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Byte-level PSD writer for fixtures. Only produces what this parser
    /// consumes: header, empty auxiliary sections, and layer records with
    /// Pascal/Unicode names.
    pub(crate) struct PsdFixture {
        width: u32,
        height: u32,
        layers: Vec<FixtureLayer>,
    }

    pub(crate) struct FixtureLayer {
        name: String,
        unicode_name: Option<String>,
        bounds: [i32; 4],
        blend_key: [u8; 4],
        opacity: u8,
        hidden: bool,
    }

    impl FixtureLayer {
        pub(crate) fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                unicode_name: None,
                bounds: [0, 0, 64, 64],
                blend_key: *b"norm",
                opacity: 255,
                hidden: false,
            }
        }

        pub(crate) fn unicode(mut self, name: &str) -> Self {
            self.unicode_name = Some(name.to_string());
            self
        }

        pub(crate) fn blend(mut self, key: [u8; 4]) -> Self {
            self.blend_key = key;
            self
        }

        pub(crate) fn opacity(mut self, opacity: u8) -> Self {
            self.opacity = opacity;
            self
        }

        pub(crate) fn hidden(mut self) -> Self {
            self.hidden = true;
            self
        }

        fn record(&self) -> Vec<u8> {
            let mut out = Vec::new();
            for bound in self.bounds {
                out.extend_from_slice(&bound.to_be_bytes());
            }
            out.extend_from_slice(&1u16.to_be_bytes()); // one channel
            out.extend_from_slice(&[0u8; 6]); // channel info
            out.extend_from_slice(b"8BIM");
            out.extend_from_slice(&self.blend_key);
            let flags = if self.hidden { 0x02 } else { 0x00 };
            out.extend_from_slice(&[self.opacity, 0, flags, 0]);

            let mut extra = Vec::new();
            extra.extend_from_slice(&0u32.to_be_bytes()); // mask data
            extra.extend_from_slice(&0u32.to_be_bytes()); // blending ranges
            let name_bytes = self.name.as_bytes();
            extra.push(name_bytes.len() as u8);
            extra.extend_from_slice(name_bytes);
            let padding = (4 - ((1 + name_bytes.len()) % 4)) % 4;
            extra.extend_from_slice(&vec![0u8; padding]);
            if let Some(unicode) = &self.unicode_name {
                let units: Vec<u16> = unicode.encode_utf16().collect();
                extra.extend_from_slice(b"8BIM");
                extra.extend_from_slice(b"luni");
                let data_len = 4 + units.len() * 2;
                extra.extend_from_slice(&(data_len as u32).to_be_bytes());
                extra.extend_from_slice(&(units.len() as u32).to_be_bytes());
                for unit in units {
                    extra.extend_from_slice(&unit.to_be_bytes());
                }
                if data_len % 2 == 1 {
                    extra.push(0);
                }
            }

            out.extend_from_slice(&(extra.len() as u32).to_be_bytes());
            out.extend_from_slice(&extra);
            out
        }
    }

    impl PsdFixture {
        pub(crate) fn new(width: u32, height: u32) -> Self {
            Self { width, height, layers: Vec::new() }
        }

        pub(crate) fn layer(mut self, layer: FixtureLayer) -> Self {
            self.layers.push(layer);
            self
        }

        pub(crate) fn bytes(&self) -> Vec<u8> {
            self.bytes_with_count(self.layers.len() as i16)
        }

        /// Like [`bytes`](Self::bytes) but with an explicit (possibly
        /// negative) raw layer count.
        pub(crate) fn bytes_with_count(&self, raw_count: i16) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend_from_slice(b"8BPS");
            out.extend_from_slice(&1u16.to_be_bytes());
            out.extend_from_slice(&[0u8; 6]);
            out.extend_from_slice(&3u16.to_be_bytes()); // channels
            out.extend_from_slice(&self.height.to_be_bytes());
            out.extend_from_slice(&self.width.to_be_bytes());
            out.extend_from_slice(&8u16.to_be_bytes()); // depth
            out.extend_from_slice(&3u16.to_be_bytes()); // RGB
            out.extend_from_slice(&0u32.to_be_bytes()); // color mode data
            out.extend_from_slice(&0u32.to_be_bytes()); // image resources

            if self.layers.is_empty() && raw_count == 0 {
                out.extend_from_slice(&0u32.to_be_bytes());
                return out;
            }

            let records: Vec<u8> = self.layers.iter().flat_map(|l| l.record()).collect();
            let layer_info_len = 2 + records.len() as u32;
            out.extend_from_slice(&(4 + layer_info_len).to_be_bytes());
            out.extend_from_slice(&layer_info_len.to_be_bytes());
            out.extend_from_slice(&raw_count.to_be_bytes());
            out.extend_from_slice(&records);
            out
        }

        pub(crate) fn write_to(&self, path: &Path) {
            self.write_raw(path, &self.bytes());
        }

        pub(crate) fn write_raw(&self, path: &Path, bytes: &[u8]) {
            let mut file = File::create(path).unwrap();
            file.write_all(bytes).unwrap();
        }
    }

    #[test]
    fn test_flattened_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.psd");
        PsdFixture::new(1920, 1080).write_to(&path);

        let info = read_info(&path).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.channels, 3);
        assert_eq!(info.depth, 8);
        assert_eq!(info.color_mode, ColorMode::Rgb);
        assert_eq!(info.layer_count, 0);
        assert!(info.layer_names.is_empty());
    }

    #[test]
    fn test_layer_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layered.psd");
        PsdFixture::new(800, 600)
            .layer(FixtureLayer::new("Background"))
            .layer(FixtureLayer::new("Shadow").blend(*b"mul ").opacity(128))
            .layer(FixtureLayer::new("Title Text").hidden())
            .write_to(&path);

        let detailed = read_detailed(&path).unwrap();
        assert_eq!(detailed.layers.len(), 3);
        assert_eq!(detailed.info.layer_names, vec!["Background", "Shadow", "Title Text"]);

        let shadow = &detailed.layers[1];
        assert_eq!(shadow.blend_mode, BlendMode::Multiply);
        assert_eq!(shadow.opacity, 128);
        assert!(shadow.visible);
        assert_eq!(shadow.kind, LayerKind::Effect);
        assert_eq!(shadow.content_hash.len(), 16);

        let title = &detailed.layers[2];
        assert!(!title.visible);
        assert_eq!(title.kind, LayerKind::Text);
        assert_eq!(detailed.layers[0].kind, LayerKind::Background);
    }

    #[test]
    fn test_unicode_name_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unicode.psd");
        PsdFixture::new(64, 64)
            .layer(FixtureLayer::new("ascii-fallback").unicode("背景レイヤー"))
            .write_to(&path);

        let detailed = read_detailed(&path).unwrap();
        assert_eq!(detailed.layers[0].name, "背景レイヤー");
    }

    #[test]
    fn test_negative_layer_count_uses_magnitude() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("negative.psd");
        let fixture = PsdFixture::new(64, 64)
            .layer(FixtureLayer::new("a"))
            .layer(FixtureLayer::new("b"));
        fixture.write_raw(&path, &fixture.bytes_with_count(-2));

        let info = read_info(&path).unwrap();
        assert_eq!(info.layer_count, 2);
        assert_eq!(info.layer_names, vec!["a", "b"]);
    }

    #[test]
    fn test_bad_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.psd");
        std::fs::write(&path, b"NOPE....definitely not a psd").unwrap();
        let err = read_info(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotPsd(_)));
    }

    #[test]
    fn test_unsupported_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v9.psd");
        let mut bytes = PsdFixture::new(10, 10).bytes();
        bytes[4..6].copy_from_slice(&9u16.to_be_bytes());
        std::fs::write(&path, bytes).unwrap();
        let err = read_info(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedVersion(9)));
    }

    #[test]
    fn test_corrupt_layer_degrades_to_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.psd");
        let fixture = PsdFixture::new(64, 64).layer(FixtureLayer::new("first"));
        let mut bytes = fixture.bytes();
        // Claim two layers but provide records for one.
        let count_offset = bytes.len() - fixture.layers[0].record().len() - 2;
        bytes[count_offset..count_offset + 2].copy_from_slice(&2i16.to_be_bytes());
        std::fs::write(&path, bytes).unwrap();

        let detailed = read_detailed(&path).unwrap();
        assert_eq!(detailed.layers.len(), 2);
        assert_eq!(detailed.layers[0].name, "first");
        assert_eq!(detailed.layers[1].name, "Layer 2");
        assert_eq!(detailed.layers[1].opacity, 255);
        assert!(detailed.layers[1].visible);
    }

    #[test]
    fn test_truncated_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.psd");
        std::fs::write(&path, b"8BPS\x00\x01").unwrap();
        let err = read_info(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Truncated(_)));
    }
}
