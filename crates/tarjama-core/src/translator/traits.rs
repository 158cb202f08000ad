use async_trait::async_trait;
use crate::config::Lang;
use crate::error::{Error, Result};

/// Information about a translator backend
#[derive(Debug, Clone)]
pub struct TranslatorInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether this translator requires an API key
    pub requires_api_key: bool,
    /// Whether this translator accepts index-keyed batches
    pub supports_batch: bool,
}

/// Trait for translation backends
///
/// Implementations make exactly one request per call. Retrying, batching and
/// fallback are handled by [`BatchTranslator`](super::BatchTranslator).
#[async_trait]
pub trait Translator: Send + Sync {
    /// Get information about this translator
    fn info(&self) -> TranslatorInfo;

    /// Get the translator name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Translate text from source language to target language
    async fn translate(
        &self,
        text: &str,
        source: &Lang,
        target: &Lang,
    ) -> Result<String>;

    /// Translate several strings in one request.
    ///
    /// `entries` pairs each text with the key it must be returned under. The
    /// reply is returned as parsed JSON, unvalidated; callers check it
    /// against the keys they asked for.
    async fn translate_keyed(
        &self,
        entries: &[(usize, &str)],
        source: &Lang,
        target: &Lang,
    ) -> Result<serde_json::Value> {
        let _ = (entries, source, target);
        Err(Error::TranslationRequest(format!(
            "{} does not support batch requests",
            self.name()
        )))
    }
}
