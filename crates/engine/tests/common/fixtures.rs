//! Synthesized design-file fixtures.
//!
//! Tests build minimal but structurally valid PSD documents byte by byte:
//! header, empty color-mode section, an image-resources section used as a
//! size/compressibility knob, and real layer records with Pascal names.

#![allow(dead_code)]

/// A buildable PSD document fixture.
pub struct PsdBuilder {
    width: u32,
    height: u32,
    resources: Vec<u8>,
    layers: Vec<(String, [u8; 4])>,
}

impl PsdBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            resources: Vec::new(),
            layers: Vec::new(),
        }
    }

    /// Fill the image-resources section (skipped by the parser) with
    /// arbitrary bytes, controlling document size and compressibility.
    pub fn resources(mut self, bytes: Vec<u8>) -> Self {
        self.resources = bytes;
        self
    }

    pub fn layer(mut self, name: &str) -> Self {
        self.layers.push((name.to_string(), *b"norm"));
        self
    }

    pub fn layer_blended(mut self, name: &str, key: [u8; 4]) -> Self {
        self.layers.push((name.to_string(), key));
        self
    }

    pub fn bytes(&self) -> Vec<u8> {
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
        out.extend_from_slice(&(self.resources.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.resources);

        if self.layers.is_empty() {
            out.extend_from_slice(&0u32.to_be_bytes());
            return out;
        }
        let records: Vec<u8> = self.layers.iter().flat_map(|(name, key)| layer_record(name, *key)).collect();
        let layer_info_len = 2 + records.len() as u32;
        out.extend_from_slice(&(4 + layer_info_len).to_be_bytes());
        out.extend_from_slice(&layer_info_len.to_be_bytes());
        out.extend_from_slice(&(self.layers.len() as i16).to_be_bytes());
        out.extend_from_slice(&records);
        out
    }

    pub fn write_to(&self, path: &std::path::Path) {
        std::fs::write(path, self.bytes()).unwrap();
    }
}

fn layer_record(name: &str, blend_key: [u8; 4]) -> Vec<u8> {
    let mut out = Vec::new();
    for bound in [0i32, 0, 128, 128] {
        out.extend_from_slice(&bound.to_be_bytes());
    }
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&[0u8; 6]); // channel info
    out.extend_from_slice(b"8BIM");
    out.extend_from_slice(&blend_key);
    out.extend_from_slice(&[255, 0, 0, 0]); // opacity, clipping, flags, filler

    let mut extra = Vec::new();
    extra.extend_from_slice(&0u32.to_be_bytes()); // mask data
    extra.extend_from_slice(&0u32.to_be_bytes()); // blending ranges
    let name_bytes = name.as_bytes();
    extra.push(name_bytes.len() as u8);
    extra.extend_from_slice(name_bytes);
    let padding = (4 - ((1 + name_bytes.len()) % 4)) % 4;
    extra.extend_from_slice(&vec![0u8; padding]);

    out.extend_from_slice(&(extra.len() as u32).to_be_bytes());
    out.extend_from_slice(&extra);
    out
}

/// Highly compressible filler.
pub fn zeros(len: usize) -> Vec<u8> {
    vec![0u8; len]
}

/// Deterministic high-entropy filler (xorshift64) — effectively
/// incompressible, for exercising ratio fallbacks.
pub fn noise(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed | 1;
    let mut out = Vec::with_capacity(len + 8);
    while out.len() < len {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        out.extend_from_slice(&state.to_le_bytes());
    }
    out.truncate(len);
    out
}
