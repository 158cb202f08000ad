use thiserror::Error;

/// Unified error type for tarjama-core
///
/// Grouped by the stage that produces it:
/// - PDF operations (opening, extracting spans, editing, saving)
/// - Font loading and embedding
/// - Translation backends (requests, responses, rate limiting)
/// - Configuration (loading, validation)
/// - General I/O
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Failed to extract text spans from a PDF page
    #[error("failed to extract text from page {page}: {reason}")]
    PdfTextExtraction { page: usize, reason: String },

    /// A single span could not be rendered (the span is skipped, not the page)
    #[error("failed to render span: {0}")]
    SpanRender(String),

    /// Failed to build the output page tree
    #[error("failed to assemble output PDF: {0}")]
    PdfAssembly(String),

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Font Errors
    // ==========================================================================
    /// The configured font file does not exist
    #[error("font file not found: {0}")]
    FontMissing(String),

    /// The font file exists but is not a usable TrueType font
    #[error("failed to parse font: {0}")]
    FontParse(String),

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// Translation API request failed
    #[error("translation API request failed: {0}")]
    TranslationRequest(String),

    /// Invalid response from translation API
    #[error("invalid translation API response: {0}")]
    TranslationInvalidResponse(String),

    /// Rate limited by translation API
    #[error("translation rate limited{}", .retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    TranslationRateLimited { retry_after: Option<u64> },

    /// API key not configured for a backend that needs one
    #[error("translation API key not configured for {0}")]
    TranslationMissingApiKey(&'static str),

    /// Translation request timed out
    #[error("translation request timed out")]
    TranslationTimeout,

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

impl Error {
    /// Whether this error means the backend asked us to slow down.
    ///
    /// Some backends surface quota errors as generic request failures, so the
    /// message is checked for the HTTP status and Google's quota code too.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::TranslationRateLimited { .. } => true,
            Self::TranslationRequest(msg) | Self::TranslationInvalidResponse(msg) => {
                msg.contains("429") || msg.contains("RESOURCE_EXHAUSTED")
            }
            _ => false,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.is_rate_limited() || matches!(self, Self::TranslationTimeout)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
