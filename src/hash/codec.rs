use std::error::Error;
use std::fmt;

use sha1::{Digest, Sha1};

use crate::model::ui_tree::UiNode;

/// Grid side of the perceptual downsample: hashes are GRID*GRID bits.
const GRID: u32 = 8;

/// Raw input failed basic shape checks; the only way any codec
/// function can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidInputError {
    pub message: String,
}

impl InvalidInputError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for InvalidInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid codec input: {}", self.message)
    }
}

impl Error for InvalidInputError {}

/// Single-channel screenshot buffer, row-major, one byte per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self { width, height, pixels }
    }
}

// ============================================================================
// Structural hash
// ============================================================================

/// Hash a serialized UI tree. Parses the JSON, then hashes the normalized
/// rendering; fails only on malformed input.
pub fn structural_hash(serialized_ui_tree: &str) -> Result<String, InvalidInputError> {
    if serialized_ui_tree.trim().is_empty() {
        return Err(InvalidInputError::new("empty UI tree"));
    }
    let root: UiNode = serde_json::from_str(serialized_ui_tree)
        .map_err(|e| InvalidInputError::new(format!("unparsable UI tree: {}", e)))?;
    Ok(structural_hash_of(&root))
}

/// Hash an already-parsed UI tree.
///
/// The canonical rendering walks depth-first and emits attributes in a fixed
/// sorted order. Volatile attributes (bounds, focus, selection) are left out
/// so that layout jitter does not change screen identity; text and flags that
/// define what the screen *is* stay in.
pub fn structural_hash_of(root: &UiNode) -> String {
    let mut canonical = String::new();
    render_node(root, &mut canonical);

    let mut hasher = Sha1::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn render_node(node: &UiNode, out: &mut String) {
    out.push('(');
    // Keys in sorted order: class, content-desc, editable, enabled,
    // password, resource-id, text. Clickable participates too.
    push_attr(out, "class", node.class.as_deref());
    push_flag(out, "clickable", node.clickable);
    push_attr(out, "content-desc", node.content_desc.as_deref());
    push_flag(out, "editable", node.editable);
    push_flag(out, "enabled", node.enabled);
    push_flag(out, "password", node.password);
    push_attr(out, "resource-id", node.resource_id.as_deref());
    push_attr(out, "text", node.text.as_deref());

    for child in &node.children {
        render_node(child, out);
    }
    out.push(')');
}

fn push_attr(out: &mut String, key: &str, value: Option<&str>) {
    if let Some(v) = value {
        out.push_str(key);
        out.push('=');
        out.push_str(v);
        out.push(';');
    }
}

fn push_flag(out: &mut String, key: &str, value: bool) {
    if value {
        out.push_str(key);
        out.push(';');
    }
}

// ============================================================================
// Perceptual hash
// ============================================================================

/// 64-bit average-hash of a screenshot: downsample to an 8x8 grid of block
/// means, threshold each cell against the grid mean. Robust to minor
/// rendering noise (clock ticks, antialiasing), cheap to compare.
pub fn perceptual_hash(image: &GrayImage) -> Result<u64, InvalidInputError> {
    let (w, h) = (image.width, image.height);
    if w == 0 || h == 0 {
        return Err(InvalidInputError::new("zero-sized image"));
    }
    if image.pixels.len() != (w as usize) * (h as usize) {
        return Err(InvalidInputError::new(format!(
            "pixel buffer length {} does not match {}x{}",
            image.pixels.len(),
            w,
            h
        )));
    }

    let mut cells = [0f64; (GRID * GRID) as usize];
    for gy in 0..GRID {
        let y0 = (gy * h / GRID) as usize;
        let y1 = (((gy + 1) * h).div_ceil(GRID)) as usize;
        for gx in 0..GRID {
            let x0 = (gx * w / GRID) as usize;
            let x1 = (((gx + 1) * w).div_ceil(GRID)) as usize;

            let mut sum = 0u64;
            for y in y0..y1 {
                let row = y * w as usize;
                for x in x0..x1 {
                    sum += u64::from(image.pixels[row + x]);
                }
            }
            let count = ((y1 - y0) * (x1 - x0)).max(1) as f64;
            cells[(gy * GRID + gx) as usize] = sum as f64 / count;
        }
    }

    let mean: f64 = cells.iter().sum::<f64>() / cells.len() as f64;
    let mut hash = 0u64;
    for (i, cell) in cells.iter().enumerate() {
        if *cell > mean {
            hash |= 1u64 << i;
        }
    }
    Ok(hash)
}

/// Hamming distance between two perceptual hashes. Symmetric; zero iff equal.
pub fn hash_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Composite screen identity: structural and perceptual fingerprints joined.
pub fn composite_hash(structural: &str, perceptual: u64) -> String {
    format!("{}_{:016x}", structural, perceptual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_zero_iff_equal() {
        assert_eq!(hash_distance(0xdead_beef, 0xdead_beef), 0);
        assert_eq!(hash_distance(0b1011, 0b0011), 1);
        assert_eq!(hash_distance(0b1011, 0b0011), hash_distance(0b0011, 0b1011));
    }
}
