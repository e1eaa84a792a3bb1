//! Arabic Overlay Core Library
//!
//! This library builds translation overlays for PDF pages:
//! - Filtering, ordering and batching of extracted text blocks
//! - Translation via OpenAI-compatible APIs (batched, cached)
//! - Arabic shaping (presentation forms + bidi reordering)
//! - Non-overlapping placement of translated blocks
//! - Overlay rendering to standalone single-page PDFs
//!
//! The overlay contains only the translations; compositing it onto the
//! original page is left to the caller.

pub mod cache;
pub mod config;
pub mod error;
pub mod font;
pub mod layout;
pub mod overlay;
pub mod shaping;
pub mod translator;
pub mod util;

pub use cache::{CacheKey, TranslationCache};
pub use config::{AppConfig, CacheConfig, FontConfig, Lang, TextColor, TranslatorConfig};
pub use error::{Error, Result};
pub use font::OverlayFont;
pub use layout::{
    BlockKind, BoundingBox, ExtractedDocument, ExtractedPage, PagePlacer, PageSize, PlacedRect,
    RawBlock, TranslatedBlock,
};
pub use overlay::{
    Canvas, OverlayRenderer, PdfCanvas, RenderStats, combine_overlay_pages,
};
pub use shaping::{ArabicShaper, TextShaper};
pub use translator::{OpenAiTranslator, Translator, create_translator};
pub use util::clear_translation_cache;

use std::sync::Arc;

use tracing::{debug, info, warn};

use layout::TRANSLATION_BATCH_SIZE;

/// High-level overlay translator that combines all components.
pub struct OverlayTranslator {
    translator: Arc<dyn Translator>,
    cache: TranslationCache,
    shaper: ArabicShaper,
    font: Option<Arc<OverlayFont>>,
    config: AppConfig,
}

/// Result of processing a single page.
pub struct PageOverlay {
    /// Page number (0-indexed)
    pub page_num: usize,
    /// Overlay PDF bytes (single page, translations only)
    pub pdf_bytes: Vec<u8>,
    /// Per-block outcome counts for the overlay pass
    pub stats: RenderStats,
}

impl OverlayTranslator {
    /// Create a new overlay translator with the given configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        let translator = create_translator(&config.translator)?;
        let cache = TranslationCache::new(&config.cache)?;

        Ok(Self::assemble(translator, cache, config))
    }

    /// Create with a shared cache (for cache sharing across instances).
    pub fn with_cache(config: AppConfig, cache: TranslationCache) -> Result<Self> {
        let translator = create_translator(&config.translator)?;

        Ok(Self::assemble(translator, cache, config))
    }

    /// Create with a custom translator.
    pub fn with_translator(translator: Arc<dyn Translator>, config: AppConfig) -> Result<Self> {
        let cache = TranslationCache::new(&config.cache)?;

        Ok(Self::assemble(translator, cache, config))
    }

    fn assemble(
        translator: Arc<dyn Translator>,
        cache: TranslationCache,
        config: AppConfig,
    ) -> Self {
        let shaper = ArabicShaper::new(config.font.size);
        let font = OverlayFont::discover(&config.font).map(Arc::new);

        Self {
            translator,
            cache,
            shaper,
            font,
            config,
        }
    }

    /// Translate one page's blocks: filter, order, batch, consult the
    /// cache, call the translator.
    ///
    /// A batch that fails to translate contributes zero blocks; the rest of
    /// the page continues. Empty or whitespace-only translations are
    /// dropped.
    pub async fn translate_blocks(
        &self,
        page: &ExtractedPage,
        page_num: usize,
    ) -> Vec<TranslatedBlock> {
        let ordered = layout::reading_order(&page.blocks);
        if ordered.is_empty() {
            debug!("No translatable blocks on page {}", page_num + 1);
            return Vec::new();
        }

        let mut translated = Vec::new();

        for batch in ordered.chunks(TRANSLATION_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|b| b.text.clone()).collect();

            let key = CacheKey::from_batch(
                &texts,
                self.translator.name(),
                &self.config.source_lang,
                &self.config.target_lang,
            );

            let translations = if let Some(hit) = self.cache.get_batch(&key).await {
                debug!(
                    "Cache hit for batch of {} on page {}",
                    texts.len(),
                    page_num + 1
                );
                hit
            } else {
                match self
                    .translator
                    .translate_batch(&texts, &self.config.source_lang, &self.config.target_lang)
                    .await
                {
                    Ok(batch_translations) => {
                        self.cache.insert_batch(&key, &batch_translations).await;
                        batch_translations
                    }
                    Err(e) => {
                        warn!(
                            "Dropping batch of {} on page {}: {}",
                            texts.len(),
                            page_num + 1,
                            e
                        );
                        continue;
                    }
                }
            };

            for (translation, block) in translations.iter().zip(batch) {
                if translation.trim().is_empty() {
                    continue;
                }

                translated.push(TranslatedBlock {
                    text: translation.clone(),
                    original_text: block.text.clone(),
                    original_bbox: block.bbox,
                    kind: BlockKind::Text,
                    page: page_num,
                });
            }
        }

        translated
    }

    /// Build the overlay for a single page.
    ///
    /// An unrecoverable overlay pass still yields a valid, empty page of
    /// the right dimensions; the caller always gets something to composite.
    pub async fn process_page(
        &self,
        page: &ExtractedPage,
        page_num: usize,
    ) -> Result<PageOverlay> {
        info!("Processing page {} with {}", page_num + 1, self.translator.name());

        let blocks = self.translate_blocks(page, page_num).await;
        let size = page.size();

        let renderer =
            OverlayRenderer::new(&self.shaper, self.config.text_color, self.config.font.size);
        let mut canvas = PdfCanvas::new(size, self.font.clone());
        let stats = renderer.render_page(&blocks, size, &mut canvas);

        let pdf_bytes = match canvas.finish() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    "Overlay pass failed for page {}, emitting empty page: {}",
                    page_num + 1,
                    e
                );
                PdfCanvas::empty_page(size)?
            }
        };

        debug!(
            "Page {}: {} placed, {} skipped, {} failed",
            page_num + 1,
            stats.placed,
            stats.skipped,
            stats.failed
        );

        Ok(PageOverlay {
            page_num,
            pdf_bytes,
            stats,
        })
    }

    /// Build overlays for every page and combine them into one document.
    pub async fn process_document(
        &self,
        doc: &ExtractedDocument,
        progress_callback: Option<Box<dyn Fn(usize, usize) + Send>>,
    ) -> Result<Vec<u8>> {
        let total_pages = doc.pages.len();
        let mut overlay_pages = Vec::with_capacity(total_pages);

        for (page_num, page) in doc.pages.iter().enumerate() {
            let result = self.process_page(page, page_num).await?;
            overlay_pages.push(result.pdf_bytes);

            if let Some(ref callback) = progress_callback {
                callback(page_num + 1, total_pages);
            }
        }

        combine_overlay_pages(&overlay_pages)
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn translator_info(&self) -> translator::TranslatorInfo {
        self.translator.info()
    }

    /// Whether a real Arabic font was found for overlay text.
    pub const fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.source_lang.as_str(), "en");
        assert_eq!(config.target_lang.as_str(), "ar");
    }
}
