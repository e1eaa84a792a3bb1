//! Greedy placement of translated text boxes.
//!
//! # Coordinate System
//!
//! Extracted bounding boxes use a **top-left origin** (y grows downward),
//! the drawing canvas a **bottom-left origin** (y grows upward). The
//! conversion is:
//! ```text
//! canvas_y = page_height - bbox_y
//! ```
//!
//! # Strategy
//!
//! Each translated block starts directly above its source text, left edges
//! aligned. While the candidate collides with an earlier placement it steps
//! upward one text-height at a time; running out of vertical room moves the
//! search one column to the right and restarts from the top; running out of
//! horizontal room wraps back to the left margin. The walk is greedy,
//! deterministic and single-pass: once a slot is taken it is never revisited.

use super::blocks::{BoundingBox, PageSize};

/// Margin kept clear on all four page edges.
pub const PAGE_MARGIN: f32 = 5.0;

/// Vertical gap between stacked candidate positions.
pub const VERTICAL_GAP: f32 = 5.0;

/// Horizontal advance when a column is exhausted.
pub const COLUMN_ADVANCE_GAP: f32 = 10.0;

/// A placed overlay rectangle in canvas coordinates (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PlacedRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Strict open-interval intersection on both axes. Rectangles that
    /// merely touch do not overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

/// Per-page placement session.
///
/// Owns the list of rectangles placed so far; created fresh for every page
/// and discarded afterwards, so pages can be laid out in parallel without
/// shared state.
#[derive(Debug)]
pub struct PagePlacer {
    page_width: f32,
    page_height: f32,
    placed: Vec<PlacedRect>,
}

impl PagePlacer {
    pub const fn new(page: PageSize) -> Self {
        Self {
            page_width: page.width,
            page_height: page.height,
            placed: Vec::new(),
        }
    }

    /// Rectangles placed on this page so far, in placement order.
    pub fn placed(&self) -> &[PlacedRect] {
        &self.placed
    }

    /// Find a position for a translated text box of `text_width` ×
    /// `text_height` belonging to `original` (extractor coordinates),
    /// record it, and return its lower-left corner.
    ///
    /// The search is bounded: a page too small to ever fit the box falls
    /// back to the clamped starting candidate after exhausting one full
    /// sweep of the page grid.
    pub fn place(
        &mut self,
        original: BoundingBox,
        text_width: f32,
        text_height: f32,
    ) -> (f32, f32) {
        // Start directly above the original block, left edges aligned,
        // flipping the bbox's top-down y into canvas bottom-up y.
        let start_x = original.x0;
        let start_y = self.page_height - original.y1 - text_height - VERTICAL_GAP;

        let mut x = self.clamp_x(start_x, text_width);
        let mut y = self.clamp_y(start_y, text_height);

        let mut remaining = self.attempt_cap(text_width, text_height);

        while self.collides(PlacedRect::new(x, y, text_width, text_height)) {
            if remaining == 0 {
                // Degenerate page: give up and settle for the clamped
                // candidate so the walk always terminates.
                x = self.clamp_x(x, text_width);
                y = self.clamp_y(y, text_height);
                break;
            }
            remaining -= 1;

            y -= text_height + VERTICAL_GAP;
            if y < PAGE_MARGIN {
                // Column exhausted: back to the top, one column right.
                y = self.page_height - text_height - PAGE_MARGIN;
                x += text_width + COLUMN_ADVANCE_GAP;
                if x + text_width > self.page_width - PAGE_MARGIN {
                    x = PAGE_MARGIN;
                }
            }
        }

        self.placed.push(PlacedRect::new(x, y, text_width, text_height));
        (x, y)
    }

    fn collides(&self, candidate: PlacedRect) -> bool {
        self.placed.iter().any(|used| candidate.overlaps(used))
    }

    // Manual clamping: the upper bound can drop below the margin when the
    // page is smaller than the text box, in which case the margin wins.
    fn clamp_x(&self, x: f32, text_width: f32) -> f32 {
        x.min(self.page_width - text_width - PAGE_MARGIN).max(PAGE_MARGIN)
    }

    fn clamp_y(&self, y: f32, text_height: f32) -> f32 {
        y.min(self.page_height - text_height - PAGE_MARGIN).max(PAGE_MARGIN)
    }

    /// One full sweep of the page grid, plus one.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn attempt_cap(&self, text_width: f32, text_height: f32) -> usize {
        let rows = (self.page_height / text_height.max(1.0)).ceil().max(1.0);
        let cols = (self.page_width / text_width.max(1.0)).ceil().max(1.0);
        (rows * cols) as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_within_margins(placer: &PagePlacer, page: PageSize) {
        for rect in placer.placed() {
            assert!(rect.x >= PAGE_MARGIN, "x {} below margin", rect.x);
            assert!(rect.y >= PAGE_MARGIN, "y {} below margin", rect.y);
            assert!(
                rect.x + rect.width <= page.width - PAGE_MARGIN + 1e-3,
                "right edge {} past margin",
                rect.x + rect.width
            );
            assert!(
                rect.y + rect.height <= page.height - PAGE_MARGIN + 1e-3,
                "top edge {} past margin",
                rect.y + rect.height
            );
        }
    }

    fn assert_no_overlaps(placer: &PagePlacer) {
        let placed = placer.placed();
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_overlap_is_strict() {
        let a = PlacedRect::new(0.0, 0.0, 10.0, 10.0);
        let touching = PlacedRect::new(10.0, 0.0, 10.0, 10.0);
        let inside = PlacedRect::new(5.0, 5.0, 10.0, 10.0);
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
        assert!(inside.overlaps(&a));
    }

    #[test]
    fn test_first_block_sits_above_original() {
        let page = PageSize::new(612.0, 792.0);
        let mut placer = PagePlacer::new(page);
        let (x, y) = placer.place(BoundingBox::new(10.0, 700.0, 60.0, 720.0), 50.0, 21.0);
        assert!((x - 10.0).abs() < 1e-4);
        // canvas_y = 792 - 720 - 21 - 5
        assert!((y - 46.0).abs() < 1e-4);
    }

    #[test]
    fn test_identical_blocks_never_overlap() {
        let page = PageSize::new(612.0, 792.0);
        let mut placer = PagePlacer::new(page);
        let bbox = BoundingBox::new(100.0, 400.0, 200.0, 420.0);
        for _ in 0..6 {
            placer.place(bbox, 90.0, 21.0);
        }
        assert_eq!(placer.placed().len(), 6);
        assert_no_overlaps(&placer);
        assert_within_margins(&placer, page);
    }

    #[test]
    fn test_two_stacked_blocks_do_not_overlap() {
        let page = PageSize::new(612.0, 792.0);
        let mut placer = PagePlacer::new(page);
        placer.place(BoundingBox::new(10.0, 700.0, 60.0, 720.0), 42.0, 21.0);
        placer.place(BoundingBox::new(10.0, 650.0, 60.0, 670.0), 42.0, 21.0);
        assert_no_overlaps(&placer);
        assert_within_margins(&placer, page);
    }

    #[test]
    fn test_wraparound_forces_horizontal_advance() {
        // Page only 1.5 text-heights tall: the second block exhausts the
        // single row and must move one column to the right.
        let text_h = 20.0;
        let text_w = 40.0;
        let page = PageSize::new(400.0, text_h * 1.5);
        let mut placer = PagePlacer::new(page);
        let bbox = BoundingBox::new(5.0, 0.0, 45.0, 10.0);
        for _ in 0..3 {
            placer.place(bbox, text_w, text_h);
        }
        let xs: Vec<f32> = placer.placed().iter().map(|r| r.x).collect();
        let advanced = placer
            .placed()
            .windows(2)
            .any(|w| (w[1].x - w[0].x - (text_w + COLUMN_ADVANCE_GAP)).abs() < 1e-3);
        assert!(advanced, "expected a column advance, got xs {xs:?}");
    }

    #[test]
    fn test_terminates_on_page_smaller_than_block() {
        // The box cannot fit at all; the cap must kick in and return a
        // clamped candidate instead of spinning forever.
        let page = PageSize::new(30.0, 30.0);
        let mut placer = PagePlacer::new(page);
        for _ in 0..4 {
            let (x, y) = placer.place(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 50.0, 50.0);
            assert!((x - PAGE_MARGIN).abs() < 1e-4);
            assert!((y - PAGE_MARGIN).abs() < 1e-4);
        }
    }

    #[test]
    fn test_placement_is_deterministic() {
        let page = PageSize::new(612.0, 792.0);
        let run = || {
            let mut placer = PagePlacer::new(page);
            let bbox = BoundingBox::new(50.0, 300.0, 150.0, 320.0);
            (0..5).map(|_| placer.place(bbox, 80.0, 21.0)).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_candidate_clamped_into_margins() {
        let page = PageSize::new(612.0, 792.0);
        let mut placer = PagePlacer::new(page);
        // Original sits at the very right edge; x must clamp back inside.
        let (x, _) = placer.place(BoundingBox::new(600.0, 700.0, 612.0, 720.0), 100.0, 21.0);
        assert!((x - (612.0 - 100.0 - PAGE_MARGIN)).abs() < 1e-4);

        // Original at the very bottom; y must clamp up to the margin.
        let (_, y) = placer.place(BoundingBox::new(10.0, 780.0, 60.0, 792.0), 40.0, 21.0);
        assert!(y >= PAGE_MARGIN);
        assert_within_margins(&placer, page);
    }
}
