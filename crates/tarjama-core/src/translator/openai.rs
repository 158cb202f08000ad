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

/// OpenAI-compatible API translator
/// Works with: llama.cpp server, Ollama, DeepSeek, OpenAI, etc.
pub struct OpenAiTranslator {
    client: Client,
    /// Base URL for the API (e.g., "http://localhost:8080/v1")
    pub api_base: String,
    /// Optional API key for authentication
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiTranslator {
    pub fn new(
        api_base: String,
        api_key: Option<String>,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_base,
            api_key,
            model,
        })
    }

    fn build_request(&self, prompt: String, json_reply: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
            // Lower temperature for more consistent translations
            temperature: Some(0.3),
            response_format: json_reply.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }

    /// Send one chat completion and return the first choice's text.
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        debug!("Chat completion request to {}", url);

        let mut req = self.client.post(&url).json(request);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let response = req.send().await.map_err(|e| send_error(&e))?;
        let response = check_status(response).await?;
        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::TranslationInvalidResponse(e.to_string()))?;

        first_choice_text(chat)
    }
}

fn first_choice_text(chat: ChatResponse) -> Result<String> {
    chat.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::TranslationInvalidResponse("No choices in response".to_string()))
}

#[async_trait]
impl Translator for OpenAiTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "OpenAI Compatible",
            requires_api_key: false, // Optional for local servers
            supports_batch: true,
        }
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        let request = self.build_request(single_prompt(text, source, target), false);
        let reply = self.complete(&request).await?;
        Ok(clean_single_reply(&reply))
    }

    async fn translate_keyed(
        &self,
        entries: &[(usize, &str)],
        source: &Lang,
        target: &Lang,
    ) -> Result<serde_json::Value> {
        let request = self.build_request(keyed_prompt(entries, source, target), true);
        let reply = self.complete(&request).await?;
        parse_json_reply(&reply)
    }
}
