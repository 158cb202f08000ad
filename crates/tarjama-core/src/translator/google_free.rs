use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::http::{build_client, check_status, send_error};
use super::traits::{Translator, TranslatorInfo};
use crate::config::Lang;
use crate::error::{Error, Result};

/// Free Google Translate endpoint, one string per request, no key
pub struct GoogleFreeTranslator {
    client: Client,
    /// e.g. "https://translate.googleapis.com"
    pub api_base: String,
}

impl GoogleFreeTranslator {
    pub fn new(api_base: String, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_base,
        })
    }

    fn request_url(&self, text: &str, source: &Lang, target: &Lang) -> String {
        format!(
            "{}/translate_a/single?client=gtx&sl={}&tl={}&dt=t&q={}",
            self.api_base.trim_end_matches('/'),
            urlencoding::encode(source.as_str()),
            urlencoding::encode(target.as_str()),
            urlencoding::encode(text)
        )
    }
}

/// Join the translated segments: the reply is `[[["seg", "src", ...], ...], ...]`.
fn parse_reply(value: &serde_json::Value) -> Result<String> {
    let segments = value
        .get(0)
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| Error::TranslationInvalidResponse("missing segment list".to_string()))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(serde_json::Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(Error::TranslationInvalidResponse(
            "no translated segments".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl Translator for GoogleFreeTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "Google Translate (free)",
            requires_api_key: false,
            supports_batch: false,
        }
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        let url = self.request_url(text, source, target);
        debug!("Free MT request ({} chars)", text.chars().count());

        let response = self.client.get(&url).send().await.map_err(|e| send_error(&e))?;
        let response = check_status(response).await?;
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::TranslationInvalidResponse(e.to_string()))?;

        parse_reply(&value)
    }
}
