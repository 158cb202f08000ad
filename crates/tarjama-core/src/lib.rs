//! Tarjama Core Library
//!
//! Translates the text of PDF documents into Arabic while keeping the page
//! layout:
//! - span extraction with mupdf
//! - batched, retrying translation through Gemini, OpenAI-compatible servers
//!   or the free Google Translate endpoint
//! - Arabic shaping and bidi reordering
//! - overlay rendering and page assembly with lopdf

pub mod config;
pub mod error;
pub mod pdf;
pub mod shaping;
pub mod translator;
pub mod util;

#[cfg(test)]
mod test_support;

pub use config::{
    AppConfig, Backoff, BackendKind, BatchConfig, Canvas, Lang, PageLayout, RenderConfig,
    TextAlign, TextColor, TranslatorConfig, DEFAULT_FONT_PATH, DEFAULT_SOURCE_LANG,
    DEFAULT_TARGET_LANG,
};
pub use error::{Error, Result};
pub use pdf::{ArabicFont, BoundingBox, PdfDocument, RenderReport, SpanOverlay, TextSpan};
pub use translator::{
    BatchTranslator, Translation, TranslationStatus, Translator, TranslatorInfo, create_translator,
};

use std::sync::Arc;
use tracing::{debug, info};

use pdf::{PageAssembler, PagePlan, SpanExtractor};

/// Progress callback: `(pages_done, pages_total)`
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Per-run overrides of the configured output shape.
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    pub layout: PageLayout,
    pub canvas: Canvas,
    /// 0-based pages to translate; `None` means every page
    pub pages: Option<Vec<usize>>,
}

impl TranslateOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            layout: config.layout,
            canvas: config.canvas,
            pages: None,
        }
    }
}

/// What happened on one source page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageReport {
    /// Page number (0-indexed)
    pub page_num: usize,
    pub spans: usize,
    pub translated: usize,
    pub skipped: usize,
    pub fallback: usize,
    pub render: RenderReport,
}

/// Output of a document translation.
#[derive(Debug)]
pub struct TranslatedDocument {
    pub pdf_bytes: Vec<u8>,
    pub page_count: usize,
    pub pages: Vec<PageReport>,
}

/// High-level PDF translator that combines all components
pub struct PdfTranslator {
    batch: BatchTranslator,
    translator_info: TranslatorInfo,
    font: ArabicFont,
    config: AppConfig,
}

impl PdfTranslator {
    /// Create a translator from configuration.
    ///
    /// Fails before any work is done if the configuration is invalid, the
    /// font file is missing or unreadable, or the backend needs an API key
    /// that is not set.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let font = ArabicFont::load(&config.render.font_path)?;
        let translator = create_translator(&config.translator)?;
        Self::with_font(translator, font, config)
    }

    /// Create with a custom translator, loading the configured font
    pub fn with_translator(translator: Arc<dyn Translator>, config: AppConfig) -> Result<Self> {
        let font = ArabicFont::load(&config.render.font_path)?;
        Self::with_font(translator, font, config)
    }

    /// Create with a custom translator and an already loaded font
    pub fn with_font(
        translator: Arc<dyn Translator>,
        font: ArabicFont,
        config: AppConfig,
    ) -> Result<Self> {
        config.validate()?;
        let translator_info = translator.info();
        let batch = BatchTranslator::new(
            translator,
            config.batch.clone(),
            config.source_lang.clone(),
            config.target_lang.clone(),
        );

        Ok(Self {
            batch,
            translator_info,
            font,
            config,
        })
    }

    /// Translate a document with the configured layout and canvas
    pub async fn translate_document(
        &self,
        doc: &PdfDocument,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<TranslatedDocument> {
        let options = TranslateOptions::from_config(&self.config);
        self.translate_with(doc, &options, progress_callback).await
    }

    /// Translate a document.
    ///
    /// Runs in two phases: every selected page is extracted and translated
    /// first, then the output PDF is assembled in one synchronous pass.
    /// Translation failures never abort the run (the source text is kept);
    /// extraction and assembly errors do.
    pub async fn translate_with(
        &self,
        doc: &PdfDocument,
        options: &TranslateOptions,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<TranslatedDocument> {
        let pages = self.selected_pages(doc, options.pages.as_deref())?;
        let total = pages.len();
        // Source text stays visible around the overlay unless the copy is blank
        let draw_untranslated =
            options.layout != PageLayout::Overwrite && options.canvas == Canvas::Blank;

        info!(
            "Translating {} of {} pages with {} ({:?}, {:?} canvas)",
            total,
            doc.page_count(),
            self.translator_info.name,
            options.layout,
            options.canvas
        );

        let mut plans = Vec::with_capacity(total);
        let mut reports = Vec::with_capacity(total);
        for (done, page_num) in pages.into_iter().enumerate() {
            let (plan, report) = self.translate_page(doc, page_num, draw_untranslated).await?;
            plans.push(plan);
            reports.push(report);

            if let Some(ref callback) = progress_callback {
                callback(done + 1, total);
            }
        }

        let assembled = PageAssembler::new(
            &self.font,
            &self.config.render,
            options.layout,
            options.canvas,
        )
        .assemble(doc, &plans)?;

        for (report, render) in reports.iter_mut().zip(assembled.reports) {
            report.render = render;
        }

        info!(
            "Wrote {} pages ({} bytes)",
            assembled.page_count,
            assembled.pdf_bytes.len()
        );
        Ok(TranslatedDocument {
            pdf_bytes: assembled.pdf_bytes,
            page_count: assembled.page_count,
            pages: reports,
        })
    }

    /// Extract and translate one page.
    async fn translate_page(
        &self,
        doc: &PdfDocument,
        page_num: usize,
        draw_untranslated: bool,
    ) -> Result<(PagePlan, PageReport)> {
        let spans = SpanExtractor::new(doc).extract_spans(page_num)?;
        let texts: Vec<String> = spans.iter().map(|s| s.text.clone()).collect();
        let translations = self.batch.translate_all(&texts).await;

        let mut report = PageReport {
            page_num,
            spans: spans.len(),
            ..PageReport::default()
        };
        let mut overlays = Vec::with_capacity(spans.len());
        for (span, translation) in spans.into_iter().zip(translations) {
            match translation.status {
                TranslationStatus::Translated => report.translated += 1,
                TranslationStatus::Skipped => report.skipped += 1,
                TranslationStatus::Fallback => report.fallback += 1,
            }
            if translation.status == TranslationStatus::Translated || draw_untranslated {
                overlays.push(SpanOverlay {
                    span,
                    translated: translation.text,
                });
            }
        }

        debug!(
            "Page {}: {} spans, {} translated, {} skipped, {} fell back",
            page_num, report.spans, report.translated, report.skipped, report.fallback
        );
        Ok((PagePlan { page_num, overlays }, report))
    }

    /// Validated, sorted, de-duplicated page selection.
    fn selected_pages(&self, doc: &PdfDocument, pages: Option<&[usize]>) -> Result<Vec<usize>> {
        let total = doc.page_count();
        let Some(pages) = pages else {
            return Ok((0..total).collect());
        };

        let mut selected = pages.to_vec();
        selected.sort_unstable();
        selected.dedup();
        if let Some(&page) = selected.iter().find(|&&p| p >= total) {
            return Err(Error::PdfInvalidPage { page, total });
        }
        Ok(selected)
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub const fn translator_info(&self) -> &TranslatorInfo {
        &self.translator_info
    }

    pub const fn font(&self) -> &ArabicFont {
        &self.font
    }
}
