//! Arabic text shaping for overlay rendering.
//!
//! PDF text operators place glyphs in storage order, so right-to-left text
//! has to be prepared before it reaches the content stream:
//!
//! 1. **Reshaping**: Arabic letters are converted into their
//!    context-dependent joined presentation forms (initial/medial/final/
//!    isolated), since the rendering primitive does no contextual analysis.
//! 2. **Bidi reordering**: the Unicode Bidirectional Algorithm (UAX #9)
//!    converts logical character order into visual order, so right-to-left
//!    runs read correctly when drawn left to right.
//!
//! Shaping is fail-soft by contract: a string that cannot be shaped is
//! rendered unshaped rather than aborting the page.

use unicode_bidi::BidiInfo;

/// Average glyph width as a fraction of font size.
/// A heuristic, not real metrics: layout only needs approximate non-overlap.
const CHAR_WIDTH_FACTOR: f32 = 0.6;

/// Line height as a multiple of font size.
const LINE_HEIGHT_FACTOR: f32 = 1.5;

/// Shaping and measurement capability consulted by the layout engine.
///
/// Kept as a trait so tests can substitute a deterministic stub (e.g. an
/// identity shaper with fixed metrics).
pub trait TextShaper: Send + Sync {
    /// Convert a logical-order string into a display-order string ready for
    /// glyph rendering. Must never panic; on any shaping anomaly the input
    /// is returned unchanged.
    fn shape(&self, text: &str) -> String;

    /// Estimate the rendered bounding box `(width, height)` of the text.
    fn measure(&self, text: &str) -> (f32, f32);
}

/// Production shaper: ar-reshaper presentation forms + unicode-bidi
/// visual reordering.
#[derive(Debug, Clone)]
pub struct ArabicShaper {
    font_size: f32,
}

impl ArabicShaper {
    pub const fn new(font_size: f32) -> Self {
        Self { font_size }
    }

    pub const fn font_size(&self) -> f32 {
        self.font_size
    }
}

impl TextShaper for ArabicShaper {
    fn shape(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let reshaped = ar_reshaper::ArabicReshaper::default().reshape(text);
        let display = reorder_visual(&reshaped);

        // A shaped result should never be empty for non-empty input; if the
        // pipeline produced nothing usable, fall back to the raw text.
        if display.is_empty() {
            text.to_string()
        } else {
            display
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn measure(&self, text: &str) -> (f32, f32) {
        let shaped = self.shape(text);
        let width = shaped.chars().count() as f32 * self.font_size * CHAR_WIDTH_FACTOR;
        let height = self.font_size * LINE_HEIGHT_FACTOR;
        (width, height)
    }
}

/// Reorder logical-order text into visual order, paragraph by paragraph.
fn reorder_visual(text: &str) -> String {
    let bidi_info = BidiInfo::new(text, None);
    let mut out = String::with_capacity(text.len());
    for para in &bidi_info.paragraphs {
        let line_range = para.range.clone();
        let reordered = bidi_info.reorder_line(para, line_range);
        out.push_str(&reordered);
    }
    out
}
