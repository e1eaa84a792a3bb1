mod blocks;
mod placement;

pub use blocks::{
    BlockKind, BoundingBox, ExtractedDocument, ExtractedPage, PageSize, RawBlock,
    TranslatedBlock, MIN_BLOCK_CHARS, TRANSLATION_BATCH_SIZE, is_translatable, reading_order,
};
pub use placement::{COLUMN_ADVANCE_GAP, PAGE_MARGIN, PagePlacer, PlacedRect, VERTICAL_GAP};
