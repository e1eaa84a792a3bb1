//! Extracted text blocks: input model, eligibility filter, reading order
//! and translation batching.
//!
//! Blocks arrive from an upstream extractor as loosely-structured records;
//! missing fields default rather than erroring, since real extractor output
//! is messy. Bounding boxes use the extractor convention: y grows downward
//! from the page top.

use serde::{Deserialize, Serialize};

/// Number of blocks submitted to the translator per request.
pub const TRANSLATION_BATCH_SIZE: usize = 10;

/// Minimum trimmed length for a block to be worth translating.
pub const MIN_BLOCK_CHARS: usize = 3;

/// Axis-aligned bounding box `(x0, y0, x1, y1)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Center point of the box.
    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Convert to array format [x0, y0, x1, y1]
    pub const fn as_array(self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        b.as_array()
    }
}

/// Page dimensions in canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A raw text block as produced by the upstream extractor.
///
/// Both fields default when absent: a block with no text is simply
/// ineligible, a block with no bbox collapses to the page origin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBlock {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub bbox: BoundingBox,
}

/// One extracted page: dimensions plus its raw blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
}

impl ExtractedPage {
    pub const fn size(&self) -> PageSize {
        PageSize::new(self.width, self.height)
    }
}

/// A whole extracted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub pages: Vec<ExtractedPage>,
}

/// Kind of content a translated block carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Text,
}

/// A block that came back from the translator, 1:1 with its source block.
#[derive(Debug, Clone)]
pub struct TranslatedBlock {
    /// Translated text to render
    pub text: String,
    /// Original text (kept for debugging/logging purposes)
    pub original_text: String,
    /// Bounding box of the original text, extractor convention
    pub original_bbox: BoundingBox,
    /// Content kind
    pub kind: BlockKind,
    /// Page number (0-indexed)
    pub page: usize,
}

/// Whether a block is worth sending to the translator.
///
/// Short fragments and bare page numbers are noise and are dropped
/// silently.
pub fn is_translatable(block: &RawBlock) -> bool {
    let text = block.text.trim();
    if text.chars().count() < MIN_BLOCK_CHARS {
        return false;
    }
    !text.chars().all(char::is_numeric)
}

/// Filter a page's blocks down to translatable ones and order them for
/// reading: top of the page first (y0 descending), then left to right
/// (x0 ascending).
pub fn reading_order(blocks: &[RawBlock]) -> Vec<&RawBlock> {
    let mut eligible: Vec<&RawBlock> = blocks.iter().filter(|b| is_translatable(b)).collect();
    eligible.sort_by(|a, b| {
        b.bbox
            .y0
            .total_cmp(&a.bbox.y0)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    eligible
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str, bbox: [f32; 4]) -> RawBlock {
        RawBlock {
            text: text.to_string(),
            bbox: bbox.into(),
        }
    }

    #[test]
    fn test_filter_drops_short_fragments() {
        assert!(!is_translatable(&block("ab", [0.0, 0.0, 1.0, 1.0])));
        assert!(is_translatable(&block("abc", [0.0, 0.0, 1.0, 1.0])));
    }

    #[test]
    fn test_filter_drops_page_numbers() {
        assert!(!is_translatable(&block("12", [0.0, 0.0, 1.0, 1.0])));
        assert!(!is_translatable(&block("1234", [0.0, 0.0, 1.0, 1.0])));
        // Arabic-Indic digits are page numbers too
        assert!(!is_translatable(&block("١٢٣", [0.0, 0.0, 1.0, 1.0])));
        // Mixed digits and letters survive
        assert!(is_translatable(&block("3rd chapter", [0.0, 0.0, 1.0, 1.0])));
    }

    #[test]
    fn test_filter_trims_before_checking() {
        assert!(!is_translatable(&block("  ab  ", [0.0, 0.0, 1.0, 1.0])));
        assert!(!is_translatable(&block("   ", [0.0, 0.0, 1.0, 1.0])));
        assert!(!is_translatable(&block("", [0.0, 0.0, 1.0, 1.0])));
    }

    #[test]
    fn test_reading_order_top_to_bottom_left_to_right() {
        let blocks = vec![
            block("bottom", [10.0, 100.0, 60.0, 120.0]),
            block("top right", [200.0, 700.0, 260.0, 720.0]),
            block("top left", [10.0, 700.0, 60.0, 720.0]),
        ];
        let ordered = reading_order(&blocks);
        let texts: Vec<&str> = ordered.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["top left", "top right", "bottom"]);
    }

    #[test]
    fn test_reading_order_filters() {
        let blocks = vec![
            block("42", [10.0, 700.0, 60.0, 720.0]),
            block("a real paragraph", [10.0, 600.0, 60.0, 620.0]),
        ];
        assert_eq!(reading_order(&blocks).len(), 1);
    }

    #[test]
    fn test_batching_sizes() {
        let blocks: Vec<RawBlock> = (0..25)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let y = 700.0 - i as f32;
                block(&format!("block number {i}"), [10.0, y, 60.0, y + 10.0])
            })
            .collect();
        let ordered = reading_order(&blocks);
        let sizes: Vec<usize> = ordered
            .chunks(TRANSLATION_BATCH_SIZE)
            .map(<[&RawBlock]>::len)
            .collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[test]
    fn test_raw_block_defaults() {
        let b: RawBlock = serde_json::from_str("{}").unwrap_or_default();
        assert_eq!(b.text, "");
        assert_eq!(b.bbox, BoundingBox::default());

        let b: RawBlock = serde_json::from_str(r#"{"text":"hi"}"#).unwrap_or_default();
        assert_eq!(b.text, "hi");
        assert_eq!(b.bbox.as_array(), [0.0, 0.0, 0.0, 0.0]);
    }
}
