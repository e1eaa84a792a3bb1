mod canvas;
mod combine;
mod renderer;

pub use canvas::{Canvas, DrawOp, PdfCanvas, RecordingCanvas};
pub use combine::combine_overlay_pages;
pub use renderer::{OverlayRenderer, RenderStats};
