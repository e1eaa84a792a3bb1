use thiserror::Error;

/// Unified error type for arabic-overlay-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Overlay creation (canvas assembly, PDF output)
/// - Font operations (discovery, parsing, embedding)
/// - Translation operations (API requests, responses, rate limiting)
/// - Cache operations (initialization, reading, writing)
/// - Configuration operations (loading, validation)
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Overlay Errors
    // ==========================================================================
    /// Failed to assemble an overlay page
    #[error("failed to create overlay page: {0}")]
    OverlayCreate(String),

    /// Failed to render a single translated block
    #[error("failed to render block: {0}")]
    OverlayRender(String),

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    InvalidPage { page: usize, total: usize },

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Font Errors
    // ==========================================================================
    /// Failed to read or parse a font file
    #[error("failed to load font {path}: {reason}")]
    FontLoad { path: String, reason: String },

    /// No usable font found among the configured candidates
    #[error("no usable font found in configured paths")]
    FontNotFound,

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// Translation API request failed
    #[error("translation API request failed: {0}")]
    TranslationRequest(String),

    /// Invalid response from translation API
    #[error("invalid translation API response: {0}")]
    TranslationInvalidResponse(String),

    /// Translator returned a batch of the wrong size
    #[error("translator returned {got} entries for a batch of {expected}")]
    TranslationBatchMismatch { expected: usize, got: usize },

    /// Rate limited by translation API
    #[error("translation rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    TranslationRateLimited { retry_after: Option<u64> },

    /// Translation request timed out
    #[error("translation request timed out")]
    TranslationTimeout,

    /// Maximum retry attempts exceeded for translation
    #[error("translation failed after maximum retries")]
    TranslationMaxRetriesExceeded,

    // ==========================================================================
    // Cache Errors
    // ==========================================================================
    /// Failed to initialize the cache
    #[error("failed to initialize cache: {0}")]
    CacheInit(String),

    /// Failed to read from cache
    #[error("failed to read from cache: {0}")]
    CacheRead(String),

    /// Failed to write to cache
    #[error("failed to write to cache: {0}")]
    CacheWrite(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
