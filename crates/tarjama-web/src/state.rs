use anyhow::{Context, Result};
use tarjama_core::{AppConfig, PdfTranslator, TranslateOptions};

/// Global application state
pub struct AppState {
    /// Built once at startup; shared by every request
    pub translator: PdfTranslator,
}

impl AppState {
    /// Fails when the font or API key is missing, so the server never starts
    /// in a state where every request would fail.
    pub fn new(config: AppConfig) -> Result<Self> {
        let translator = PdfTranslator::new(config).context("Failed to initialize translator")?;
        Ok(Self::from_translator(translator))
    }

    pub const fn from_translator(translator: PdfTranslator) -> Self {
        Self { translator }
    }

    /// Layout and canvas from the server configuration, all pages.
    pub fn default_options(&self) -> TranslateOptions {
        TranslateOptions::from_config(self.translator.config())
    }
}
