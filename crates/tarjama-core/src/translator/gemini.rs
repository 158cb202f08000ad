use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{
    build_client, check_status, clean_single_reply, keyed_prompt, parse_json_reply, send_error,
    single_prompt,
};
use super::traits::{Translator, TranslatorInfo};
use crate::config::Lang;
use crate::error::{Error, Result};

/// Google Gemini `generateContent` translator
pub struct GeminiTranslator {
    client: Client,
    /// e.g. "https://generativelanguage.googleapis.com/v1beta"
    pub api_base: String,
    api_key: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiTranslator {
    pub fn new(
        api_base: String,
        api_key: String,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::TranslationMissingApiKey("gemini"));
        }
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_base,
            api_key,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request(prompt: String, json_reply: bool) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                response_mime_type: json_reply.then_some("application/json"),
            },
        }
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let url = self.endpoint();
        debug!("Gemini request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| send_error(&e))?;
        let response = check_status(response).await?;
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::TranslationInvalidResponse(e.to_string()))?;

        candidate_text(body)
    }
}

/// Concatenated text parts of the first candidate.
fn candidate_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(Error::TranslationInvalidResponse(
            "Gemini returned no candidate text".to_string(),
        ));
    }
    Ok(text)
}

#[async_trait]
impl Translator for GeminiTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "Gemini",
            requires_api_key: true,
            supports_batch: true,
        }
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        let request = Self::build_request(single_prompt(text, source, target), false);
        let reply = self.generate(&request).await?;
        Ok(clean_single_reply(&reply))
    }

    async fn translate_keyed(
        &self,
        entries: &[(usize, &str)],
        source: &Lang,
        target: &Lang,
    ) -> Result<serde_json::Value> {
        let request = Self::build_request(keyed_prompt(entries, source, target), true);
        let reply = self.generate(&request).await?;
        parse_json_reply(&reply)
    }
}
