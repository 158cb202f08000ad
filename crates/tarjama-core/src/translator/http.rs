//! Request helpers shared by the HTTP backends.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use crate::config::Lang;
use crate::error::{Error, Result};

/// Build the HTTP client every backend uses.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| Error::TranslationRequest(format!("Failed to create HTTP client: {e}")))
}

/// Map a transport failure onto the translation error taxonomy.
pub fn send_error(e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::TranslationTimeout
    } else {
        Error::TranslationRequest(e.to_string())
    }
}

/// Pass successful responses through; turn everything else into an error.
pub async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        tracing::warn!("Rate limited, retry after {:?}s", retry_after);
        return Err(Error::TranslationRateLimited { retry_after });
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!("API error: {} - {}", status, body);
    Err(Error::TranslationRequest(format!("HTTP {status}: {body}")))
}

/// Prompt for a single string.
pub fn single_prompt(text: &str, source: &Lang, target: &Lang) -> String {
    format!(
        "Translate the following text from {} into {}. Output only the translation, no explanations.\n\nText: \"{}\"",
        source.display_name(),
        target.display_name(),
        text
    )
}

/// Prompt for an index-keyed batch.
pub fn keyed_prompt(entries: &[(usize, &str)], source: &Lang, target: &Lang) -> String {
    let payload: serde_json::Map<String, serde_json::Value> = entries
        .iter()
        .map(|(key, text)| (key.to_string(), serde_json::Value::from(*text)))
        .collect();
    format!(
        "Translate the following list of {} strings to {}. Return the result as a JSON object \
         where keys are the original indices and values are the translated strings. \
         Keep translations concise.\n\n{}",
        source.display_name(),
        target.display_name(),
        serde_json::Value::Object(payload)
    )
}

/// Parse a model reply as JSON, tolerating a Markdown code fence around it.
pub fn parse_json_reply(reply: &str) -> Result<serde_json::Value> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim())
        .map_err(|e| Error::TranslationInvalidResponse(format!("reply is not JSON: {e}")))
}

/// Drop quotes a model sometimes wraps a single translation in.
pub fn clean_single_reply(reply: &str) -> String {
    reply
        .trim()
        .trim_start_matches('"')
        .trim_end_matches('"')
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_prompt_lists_entries() {
        let prompt = keyed_prompt(
            &[(0, "Hello"), (1, "World")],
            &Lang::new("en"),
            &Lang::new("ar"),
        );
        assert!(prompt.starts_with("Translate the following list of English strings to Arabic."));
        assert!(prompt.ends_with(r#"{"0":"Hello","1":"World"}"#));
    }

    #[test]
    fn test_parse_json_reply_with_fence() {
        let value = parse_json_reply("```json\n{\"0\": \"مرحبا\"}\n```").unwrap();
        assert_eq!(value["0"], "مرحبا");
        let value = parse_json_reply("  {\"1\": \"x\"} ").unwrap();
        assert_eq!(value["1"], "x");
    }

    #[test]
    fn test_parse_json_reply_rejects_prose() {
        let err = parse_json_reply("Sure! Here you go").unwrap_err();
        assert!(matches!(err, Error::TranslationInvalidResponse(_)));
    }

    #[test]
    fn test_clean_single_reply() {
        assert_eq!(clean_single_reply(" \"مرحبا\"\n"), "مرحبا");
    }
}
