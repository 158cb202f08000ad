mod batch;
mod gemini;
mod google_free;
mod http;
mod openai;
mod traits;

pub use batch::{BatchTranslator, RetryPolicy, Translation, TranslationStatus, validate_keyed};
pub use gemini::GeminiTranslator;
pub use google_free::GoogleFreeTranslator;
pub use openai::OpenAiTranslator;
pub use traits::{Translator, TranslatorInfo};

use crate::config::{BackendKind, TranslatorConfig};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Create a translator from configuration
///
/// Fails with [`Error::TranslationMissingApiKey`] when the backend needs a
/// key and none is configured.
pub fn create_translator(config: &TranslatorConfig) -> Result<Arc<dyn Translator>> {
    let api_base = config.api_base().to_string();
    let model = config.model().to_string();
    let api_key = config
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty());

    let translator: Arc<dyn Translator> = match config.backend {
        BackendKind::Gemini => {
            let key = api_key.ok_or(Error::TranslationMissingApiKey("gemini"))?;
            Arc::new(GeminiTranslator::new(api_base, key, model, config.timeout_secs)?)
        }
        BackendKind::OpenAi => Arc::new(OpenAiTranslator::new(
            api_base,
            api_key,
            model,
            config.timeout_secs,
        )?),
        BackendKind::GoogleFree => {
            Arc::new(GoogleFreeTranslator::new(api_base, config.timeout_secs)?)
        }
    };

    tracing::debug!(
        "Using {} translator at {}",
        translator.name(),
        config.api_base()
    );
    Ok(translator)
}
