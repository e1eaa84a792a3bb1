//! Per-page overlay rendering.
//!
//! For each translated block, in reading order: shape the text, estimate
//! its box, find a non-overlapping position near the original, then emit
//! three drawing operations — a padded semi-transparent background, the
//! shaped text right-aligned inside the box, and a thin connector line back
//! to the original block's center.
//!
//! One malformed block never aborts a page: failures are logged, counted
//! and skipped.

use tracing::warn;

use crate::config::TextColor;
use crate::error::{Error, Result};
use crate::layout::{BlockKind, PagePlacer, PageSize, TranslatedBlock};
use crate::shaping::TextShaper;

use super::canvas::Canvas;

/// Padding around the text box covered by the background rectangle.
const BACKGROUND_PADDING: f32 = 4.0;

/// Background rectangle opacity.
const BACKGROUND_ALPHA: f32 = 0.9;

/// Connector line opacity.
const CONNECTOR_ALPHA: f32 = 0.3;

/// Connector line width.
const CONNECTOR_LINE_WIDTH: f32 = 0.3;

/// Distance from the top of the text box down to the baseline.
const BASELINE_DROP: f32 = 2.0;

/// Outcome counts for one page's overlay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Blocks successfully placed and drawn
    pub placed: usize,
    /// Blocks skipped by policy (wrong kind, empty text)
    pub skipped: usize,
    /// Blocks dropped because rendering them failed
    pub failed: usize,
}

/// Renders translated blocks onto a canvas.
pub struct OverlayRenderer<'a> {
    shaper: &'a dyn TextShaper,
    text_color: TextColor,
    font_size: f32,
}

impl<'a> OverlayRenderer<'a> {
    pub const fn new(shaper: &'a dyn TextShaper, text_color: TextColor, font_size: f32) -> Self {
        Self {
            shaper,
            text_color,
            font_size,
        }
    }

    /// Render one page's blocks. Placement state is created fresh here and
    /// dropped on return; pages share nothing.
    pub fn render_page(
        &self,
        blocks: &[TranslatedBlock],
        page: PageSize,
        canvas: &mut dyn Canvas,
    ) -> RenderStats {
        let mut placer = PagePlacer::new(page);
        let mut stats = RenderStats::default();

        for block in blocks {
            if block.kind != BlockKind::Text || block.text.is_empty() {
                stats.skipped += 1;
                continue;
            }

            match self.render_block(block, page, &mut placer, canvas) {
                Ok(()) => stats.placed += 1,
                Err(e) => {
                    warn!("Skipping block on page {}: {}", block.page + 1, e);
                    stats.failed += 1;
                }
            }
        }

        stats
    }

    fn render_block(
        &self,
        block: &TranslatedBlock,
        page: PageSize,
        placer: &mut PagePlacer,
        canvas: &mut dyn Canvas,
    ) -> Result<()> {
        let shaped = self.shaper.shape(&block.text);
        let (text_width, text_height) = self.shaper.measure(&block.text);

        if text_width <= 0.0 || text_height <= 0.0 {
            return Err(Error::OverlayRender(
                "text measures to an empty box".to_string(),
            ));
        }

        let (x, y) = placer.place(block.original_bbox, text_width, text_height);

        // Background behind the text, padded on each side
        canvas.fill_rect(
            x - BACKGROUND_PADDING,
            y - BACKGROUND_PADDING,
            text_width + 2.0 * BACKGROUND_PADDING,
            text_height + 2.0 * BACKGROUND_PADDING,
            TextColor::white(),
            BACKGROUND_ALPHA,
        )?;

        // Shaped text, right-aligned within the box
        canvas.draw_string_right(
            x + text_width,
            y + text_height - BASELINE_DROP,
            &shaped,
            self.font_size,
            self.text_color,
        )?;

        // Connector from the placed box's center back to the original
        // block's center, flipping the bbox's top-down y.
        let (bbox_cx, bbox_cy) = block.original_bbox.center();
        canvas.stroke_line(
            x + text_width / 2.0,
            y + text_height / 2.0,
            bbox_cx,
            page.height - bbox_cy,
            TextColor::light_gray(),
            CONNECTOR_ALPHA,
            CONNECTOR_LINE_WIDTH,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BoundingBox;
    use crate::overlay::canvas::{DrawOp, RecordingCanvas};

    /// Identity shaper with the production measuring heuristic, so layout
    /// tests are deterministic without touching reshaping tables.
    struct StubShaper {
        font_size: f32,
    }

    impl TextShaper for StubShaper {
        fn shape(&self, text: &str) -> String {
            text.to_string()
        }

        #[allow(clippy::cast_precision_loss)]
        fn measure(&self, text: &str) -> (f32, f32) {
            (
                text.chars().count() as f32 * self.font_size * 0.6,
                self.font_size * 1.5,
            )
        }
    }

    fn translated(text: &str, bbox: [f32; 4]) -> TranslatedBlock {
        TranslatedBlock {
            text: text.to_string(),
            original_text: text.to_string(),
            original_bbox: BoundingBox::from(bbox),
            kind: BlockKind::Text,
            page: 0,
        }
    }

    fn renderer(shaper: &StubShaper) -> OverlayRenderer<'_> {
        OverlayRenderer::new(shaper, TextColor::black(), shaper.font_size)
    }

    #[test]
    fn test_each_block_emits_rect_text_line() {
        let shaper = StubShaper { font_size: 14.0 };
        let mut canvas = RecordingCanvas::new();
        let blocks = vec![translated("Hello", [10.0, 700.0, 60.0, 720.0])];

        let stats = renderer(&shaper).render_page(
            &blocks,
            PageSize::new(612.0, 792.0),
            &mut canvas,
        );

        assert_eq!(stats.placed, 1);
        assert_eq!(canvas.ops.len(), 3);
        assert!(matches!(canvas.ops[0], DrawOp::Rect { .. }));
        assert!(matches!(canvas.ops[1], DrawOp::Text { .. }));
        assert!(matches!(canvas.ops[2], DrawOp::Line { .. }));
    }

    #[test]
    fn test_two_block_page_end_to_end() {
        let shaper = StubShaper { font_size: 14.0 };
        let mut canvas = RecordingCanvas::new();
        let page = PageSize::new(612.0, 792.0);
        let blocks = vec![
            translated("Hello", [10.0, 700.0, 60.0, 720.0]),
            translated("World", [10.0, 650.0, 60.0, 670.0]),
        ];

        let stats = renderer(&shaper).render_page(&blocks, page, &mut canvas);
        assert_eq!(stats.placed, 2);

        let rects: Vec<(f32, f32, f32, f32)> = canvas
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Rect {
                    x,
                    y,
                    width,
                    height,
                    ..
                } => Some((*x, *y, *width, *height)),
                _ => None,
            })
            .collect();
        assert_eq!(rects.len(), 2);

        // Un-pad the backgrounds to recover the placed text boxes
        let boxes: Vec<(f32, f32, f32, f32)> = rects
            .iter()
            .map(|(x, y, w, h)| {
                (
                    x + BACKGROUND_PADDING,
                    y + BACKGROUND_PADDING,
                    w - 2.0 * BACKGROUND_PADDING,
                    h - 2.0 * BACKGROUND_PADDING,
                )
            })
            .collect();

        let (ax, ay, aw, ah) = boxes[0];
        let (bx, by, bw, bh) = boxes[1];
        let disjoint = ax + aw <= bx || bx + bw <= ax || ay + ah <= by || by + bh <= ay;
        assert!(disjoint, "placed boxes overlap: {boxes:?}");

        for (x, y, w, h) in boxes {
            assert!(x >= 5.0 && y >= 5.0);
            assert!(x + w <= page.width - 5.0 + 1e-3);
            assert!(y + h <= page.height - 5.0 + 1e-3);
        }
    }

    #[test]
    fn test_empty_text_is_skipped() {
        let shaper = StubShaper { font_size: 14.0 };
        let mut canvas = RecordingCanvas::new();
        let blocks = vec![
            translated("", [10.0, 700.0, 60.0, 720.0]),
            translated("kept", [10.0, 650.0, 60.0, 670.0]),
        ];

        let stats = renderer(&shaper).render_page(
            &blocks,
            PageSize::new(612.0, 792.0),
            &mut canvas,
        );

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.placed, 1);
        assert_eq!(canvas.texts().len(), 1);
    }

    #[test]
    fn test_zero_measure_counts_as_failure() {
        struct ZeroShaper;
        impl TextShaper for ZeroShaper {
            fn shape(&self, text: &str) -> String {
                text.to_string()
            }
            fn measure(&self, _text: &str) -> (f32, f32) {
                (0.0, 0.0)
            }
        }

        let shaper = ZeroShaper;
        let renderer = OverlayRenderer::new(&shaper, TextColor::black(), 14.0);
        let mut canvas = RecordingCanvas::new();
        let blocks = vec![translated("text", [10.0, 700.0, 60.0, 720.0])];

        let stats = renderer.render_page(&blocks, PageSize::new(612.0, 792.0), &mut canvas);
        assert_eq!(stats.failed, 1);
        assert!(canvas.ops.is_empty());
    }

    #[test]
    fn test_connector_targets_original_center() {
        let shaper = StubShaper { font_size: 14.0 };
        let mut canvas = RecordingCanvas::new();
        let page = PageSize::new(612.0, 792.0);
        let blocks = vec![translated("Hello", [10.0, 700.0, 60.0, 720.0])];

        renderer(&shaper).render_page(&blocks, page, &mut canvas);

        let Some(DrawOp::Line { x1, y1, .. }) = canvas
            .ops
            .iter()
            .find(|op| matches!(op, DrawOp::Line { .. }))
        else {
            unreachable!("a connector line must be drawn");
        };
        assert!((x1 - 35.0).abs() < 1e-4);
        // flipped center: 792 - (700 + 720)/2
        assert!((y1 - 82.0).abs() < 1e-4);
    }
}
