//! Blend modes and layer classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A layer blend mode, decoded from the 4-character key in a layer record.
///
/// Unknown keys decode to [`Normal`](Self::Normal); the engine never needs to
/// re-encode a blend key, so the mapping is one-way.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "darken")]
    Darken,
    #[serde(rename = "lighten")]
    Lighten,
    #[serde(rename = "hue")]
    Hue,
    #[serde(rename = "saturation")]
    Saturation,
    #[serde(rename = "color")]
    Color,
    #[serde(rename = "luminosity")]
    Luminosity,
    #[serde(rename = "multiply")]
    Multiply,
    #[serde(rename = "screen")]
    Screen,
    #[serde(rename = "overlay")]
    Overlay,
    #[serde(rename = "soft light")]
    SoftLight,
    #[serde(rename = "hard light")]
    HardLight,
    #[serde(rename = "difference")]
    Difference,
    #[serde(rename = "exclusion")]
    Exclusion,
}

impl BlendMode {
    /// Decode a blend-mode key as stored in a layer record.
    ///
    /// Note that short keys are space-padded on disk (`"hue "`, `"mul "`).
    #[must_use]
    pub fn from_key(key: [u8; 4]) -> Self {
        match &key {
            b"norm" => Self::Normal,
            b"dark" => Self::Darken,
            b"lite" => Self::Lighten,
            b"hue " => Self::Hue,
            b"sat " => Self::Saturation,
            b"colr" => Self::Color,
            b"lum " => Self::Luminosity,
            b"mul " => Self::Multiply,
            b"scrn" => Self::Screen,
            b"over" => Self::Overlay,
            b"sLit" => Self::SoftLight,
            b"hLit" => Self::HardLight,
            b"diff" => Self::Difference,
            b"smud" => Self::Exclusion,
            _ => Self::Normal,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Darken => "darken",
            Self::Lighten => "lighten",
            Self::Hue => "hue",
            Self::Saturation => "saturation",
            Self::Color => "color",
            Self::Luminosity => "luminosity",
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Overlay => "overlay",
            Self::SoftLight => "soft light",
            Self::HardLight => "hard light",
            Self::Difference => "difference",
            Self::Exclusion => "exclusion",
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse layer classification, inferred from the layer name and blend mode.
///
/// PSD layer records don't carry an explicit type tag at the depth this
/// parser reads, so the kind is a heuristic over what designers actually name
/// their layers. It feeds change reporting only, never reconstruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    #[default]
    Normal,
    Text,
    Adjustment,
    Background,
    Effect,
}

impl LayerKind {
    /// Classify a layer from its name and blend mode.
    #[must_use]
    pub fn classify(name: &str, blend_mode: BlendMode) -> Self {
        let name = name.to_lowercase();
        if name.contains("text") || name.contains("txt") {
            return Self::Text;
        }
        if name.contains("adjustment") || name.contains("adj") {
            return Self::Adjustment;
        }
        if name == "background" || name.contains("bg") {
            return Self::Background;
        }
        if blend_mode != BlendMode::Normal {
            return Self::Effect;
        }
        Self::Normal
    }
}
