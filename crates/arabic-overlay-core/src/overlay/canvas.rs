//! Drawing surface for overlay pages.
//!
//! The renderer talks to a [`Canvas`] capability: rectangle fill, a
//! right-aligned string draw, and a line stroke. The production surface is
//! [`PdfCanvas`], which assembles a standalone single-page PDF holding the
//! overlay only; compositing onto the original page is the caller's job.
//!
//! Coordinates are PDF-style: origin bottom-left, y increasing upward.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use lopdf::{Document, Object, Stream};

use crate::config::TextColor;
use crate::error::{Error, Result};
use crate::font::{FONT_RESOURCE_NAME, OverlayFont};
use crate::layout::PageSize;

/// Average glyph width fraction used when no font metrics are available.
const FALLBACK_CHAR_WIDTH_FACTOR: f32 = 0.6;

/// Resource name of the built-in fallback font.
const FALLBACK_FONT_NAME: &str = "F1";

/// Drawing primitives the overlay renderer emits.
pub trait Canvas {
    /// Fill an axis-aligned rectangle, `alpha` in `[0, 1]`.
    fn fill_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: TextColor,
        alpha: f32,
    ) -> Result<()>;

    /// Draw a string so that it ends at `x_right`, with its baseline at
    /// `baseline_y`. The text is already in display order.
    fn draw_string_right(
        &mut self,
        x_right: f32,
        baseline_y: f32,
        text: &str,
        font_size: f32,
        color: TextColor,
    ) -> Result<()>;

    /// Stroke a straight line.
    fn stroke_line(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        color: TextColor,
        alpha: f32,
        line_width: f32,
    ) -> Result<()>;
}

// =============================================================================
// PDF canvas
// =============================================================================

/// A canvas that builds a fresh single-page PDF.
pub struct PdfCanvas {
    page: PageSize,
    content: String,
    /// alpha (in thousandths) -> graphics state resource
    gstates: BTreeMap<u32, String>,
    font: Option<Arc<OverlayFont>>,
    drew_text: bool,
}

impl PdfCanvas {
    /// Create a canvas for one overlay page. Without a font, text falls
    /// back to built-in Helvetica (Arabic glyphs will render incorrectly,
    /// but the page stays valid).
    pub fn new(page: PageSize, font: Option<Arc<OverlayFont>>) -> Self {
        Self {
            page,
            content: String::from("q\n"),
            gstates: BTreeMap::new(),
            font,
            drew_text: false,
        }
    }

    /// A valid, empty overlay page of the given dimensions. Used as the
    /// fallback when a page's overlay pass fails unrecoverably.
    pub fn empty_page(page: PageSize) -> Result<Vec<u8>> {
        Self::new(page, None).finish()
    }

    /// Estimated string width at the given size, from real glyph advances
    /// when a font is loaded, otherwise the layout heuristic.
    #[allow(clippy::cast_precision_loss)]
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        self.font.as_ref().map_or_else(
            || text.chars().count() as f32 * font_size * FALLBACK_CHAR_WIDTH_FACTOR,
            |font| font.string_width(text, font_size),
        )
    }

    /// Map an alpha value to an `/ExtGState` resource name, quantized to
    /// thousandths so equal alphas share one graphics state.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn gs_name(&mut self, alpha: f32) -> String {
        let key = (alpha.clamp(0.0, 1.0) * 1000.0).round() as u32;
        self.gstates
            .entry(key)
            .or_insert_with(|| format!("GSa{key}"))
            .clone()
    }

    /// Finish the page and serialize it to PDF bytes.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.content.push_str("Q\n");

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let content_stream = Stream::new(lopdf::Dictionary::new(), self.content.into_bytes());
        let content_id = doc.add_object(Object::Stream(content_stream));

        let mut resources = lopdf::Dictionary::new();

        if self.drew_text && self.font.is_none() {
            // Built-in fallback font so text operators stay resolvable
            let font_id = doc.add_object(lopdf::Dictionary::from_iter([
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"Type1".to_vec())),
                ("BaseFont", Object::Name(b"Helvetica".to_vec())),
            ]));
            resources.set(
                "Font",
                Object::Dictionary(lopdf::Dictionary::from_iter([(
                    FALLBACK_FONT_NAME,
                    Object::Reference(font_id),
                )])),
            );
        }

        if !self.gstates.is_empty() {
            let mut gs_dict = lopdf::Dictionary::new();
            for (key, name) in &self.gstates {
                #[allow(clippy::cast_precision_loss)]
                let alpha = *key as f32 / 1000.0;
                gs_dict.set(
                    name.clone(),
                    Object::Dictionary(lopdf::Dictionary::from_iter([
                        ("Type", Object::Name(b"ExtGState".to_vec())),
                        ("ca", Object::Real(alpha)),
                        ("CA", Object::Real(alpha)),
                    ])),
                );
            }
            resources.set("ExtGState", Object::Dictionary(gs_dict));
        }

        let page_id = doc.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(self.page.width),
                    Object::Real(self.page.height),
                ]),
            ),
        ]));

        let page_tree = lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(page_tree));

        let catalog_id = doc.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        // Embed the Unicode font after the page exists; registration under
        // the logical name is idempotent.
        if self.drew_text
            && let Some(font) = self.font.as_ref()
        {
            font.embed_in_document(&mut doc, page_id)?;
        }

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save overlay page: {e}")))?;

        Ok(output)
    }
}

impl Canvas for PdfCanvas {
    fn fill_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: TextColor,
        alpha: f32,
    ) -> Result<()> {
        let gs = self.gs_name(alpha);
        let _ = writeln!(
            self.content,
            "q\n/{gs} gs\n{} {} {} rg\n{x} {y} {width} {height} re f\nQ",
            color.r, color.g, color.b
        );
        Ok(())
    }

    fn draw_string_right(
        &mut self,
        x_right: f32,
        baseline_y: f32,
        text: &str,
        font_size: f32,
        color: TextColor,
    ) -> Result<()> {
        self.drew_text = true;
        let start_x = x_right - self.text_width(text, font_size);

        self.content.push_str("BT\n");
        if let Some(font) = self.font.clone() {
            let _ = writeln!(self.content, "/{FONT_RESOURCE_NAME} {font_size} Tf");
            let _ = writeln!(self.content, "{} {} {} rg", color.r, color.g, color.b);
            let _ = writeln!(self.content, "{start_x} {baseline_y} Td");
            let _ = writeln!(self.content, "<{}> Tj", font.text_to_hex_glyphs(text));
        } else {
            let _ = writeln!(self.content, "/{FALLBACK_FONT_NAME} {font_size} Tf");
            let _ = writeln!(self.content, "{} {} {} rg", color.r, color.g, color.b);
            let _ = writeln!(self.content, "{start_x} {baseline_y} Td");
            let _ = writeln!(self.content, "({}) Tj", escape_pdf_literal(text));
        }
        self.content.push_str("ET\n");
        Ok(())
    }

    fn stroke_line(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        color: TextColor,
        alpha: f32,
        line_width: f32,
    ) -> Result<()> {
        let gs = self.gs_name(alpha);
        let _ = writeln!(
            self.content,
            "q\n/{gs} gs\n{} {} {} RG\n{line_width} w\n{x0} {y0} m\n{x1} {y1} l\nS\nQ",
            color.r, color.g, color.b
        );
        Ok(())
    }
}

/// Escape a string for a PDF literal string `(...)`.
fn escape_pdf_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// Recording canvas (test double)
// =============================================================================

/// A recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        alpha: f32,
    },
    Text {
        x_right: f32,
        baseline_y: f32,
        text: String,
        font_size: f32,
    },
    Line {
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
    },
}

/// A canvas that records operations instead of drawing. Lets layout tests
/// assert on exact positions without parsing PDF output.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded background rectangles.
    pub fn rects(&self) -> Vec<&DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Rect { .. }))
            .collect()
    }

    /// All recorded text draws.
    pub fn texts(&self) -> Vec<&DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Text { .. }))
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn fill_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        _color: TextColor,
        alpha: f32,
    ) -> Result<()> {
        self.ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            alpha,
        });
        Ok(())
    }

    fn draw_string_right(
        &mut self,
        x_right: f32,
        baseline_y: f32,
        text: &str,
        font_size: f32,
        _color: TextColor,
    ) -> Result<()> {
        self.ops.push(DrawOp::Text {
            x_right,
            baseline_y,
            text: text.to_string(),
            font_size,
        });
        Ok(())
    }

    fn stroke_line(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        _color: TextColor,
        _alpha: f32,
        _line_width: f32,
    ) -> Result<()> {
        self.ops.push(DrawOp::Line { x0, y0, x1, y1 });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_page_is_valid_pdf() {
        let bytes = PdfCanvas::empty_page(PageSize::new(612.0, 792.0)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_finished_page_has_media_box() {
        let mut canvas = PdfCanvas::new(PageSize::new(300.0, 500.0), None);
        canvas
            .fill_rect(10.0, 10.0, 50.0, 20.0, TextColor::white(), 0.9)
            .unwrap();
        let bytes = canvas.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        let page_id = *pages.values().next().unwrap();
        let page = doc.get_object(page_id).unwrap();
        let Object::Dictionary(dict) = page else {
            unreachable!("page must be a dictionary");
        };
        let Ok(Object::Array(media_box)) = dict.get(b"MediaBox") else {
            unreachable!("page must carry a MediaBox");
        };
        assert_eq!(media_box.len(), 4);
    }

    #[test]
    fn test_text_draw_registers_fallback_font() {
        let mut canvas = PdfCanvas::new(PageSize::new(612.0, 792.0), None);
        canvas
            .draw_string_right(100.0, 50.0, "hello", 14.0, TextColor::black())
            .unwrap();
        let bytes = canvas.finish().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_equal_alphas_share_a_graphics_state() {
        let mut canvas = PdfCanvas::new(PageSize::new(612.0, 792.0), None);
        let a = canvas.gs_name(0.9);
        let b = canvas.gs_name(0.9);
        let c = canvas.gs_name(0.3);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(canvas.gstates.len(), 2);
    }

    #[test]
    fn test_escape_pdf_literal() {
        assert_eq!(escape_pdf_literal("a(b)c\\"), "a\\(b\\)c\\\\");
    }
}
