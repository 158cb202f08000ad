//! Order-preserving bulk translation on top of a [`Translator`].
//!
//! Whatever the backend does, `translate_all` returns exactly one
//! [`Translation`] per input string, in input order. Strings the backend
//! could not translate come back unchanged with [`TranslationStatus::Fallback`].

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::traits::Translator;
use crate::config::{Backoff, BatchConfig, Lang};
use crate::error::{Error, Result};
use crate::util::trimmed_char_count;

/// How a string ended up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationStatus {
    /// The backend returned a translation
    Translated,
    /// Too short or blank; never sent to the backend
    Skipped,
    /// The backend failed or left this string out; the source text is used
    Fallback,
}

/// One output string and its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub status: TranslationStatus,
}

impl Translation {
    fn translated(text: String) -> Self {
        Self {
            text,
            status: TranslationStatus::Translated,
        }
    }

    fn skipped(text: &str) -> Self {
        Self {
            text: text.to_string(),
            status: TranslationStatus::Skipped,
        }
    }

    fn fallback(text: &str) -> Self {
        Self {
            text: text.to_string(),
            status: TranslationStatus::Fallback,
        }
    }
}

/// Retry cap and backoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    pub backoff: Backoff,
    pub base_ms: u64,
    /// Upper bound on any single wait, server-requested or computed
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            attempts: config.retry_count.max(1),
            backoff: config.backoff,
            base_ms: config.backoff_base_ms,
            max_delay_ms: config.max_retry_delay_ms,
        }
    }

    fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Wait before retrying after failed attempt number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = match self.backoff {
            Backoff::Linear => u64::from(attempt) + 1,
            Backoff::Exponential => 1u64.checked_shl(attempt).unwrap_or(u64::MAX),
        };
        Duration::from_millis(self.base_ms.saturating_mul(factor)).min(self.max_delay())
    }

    /// Wait after `error`: the server's `Retry-After` when it sent one, else
    /// the backoff curve. Never longer than `max_delay_ms`.
    pub fn delay_after(&self, error: &Error, attempt: u32) -> Duration {
        match error {
            Error::TranslationRateLimited {
                retry_after: Some(secs),
            } => Duration::from_secs(*secs).min(self.max_delay()),
            _ => self.delay_for(attempt),
        }
    }
}

/// Batches, retries and fans out requests to a translator backend.
pub struct BatchTranslator {
    translator: Arc<dyn Translator>,
    config: BatchConfig,
    retry: RetryPolicy,
    source: Lang,
    target: Lang,
}

impl BatchTranslator {
    pub fn new(
        translator: Arc<dyn Translator>,
        config: BatchConfig,
        source: Lang,
        target: Lang,
    ) -> Self {
        Self {
            retry: RetryPolicy::from_config(&config),
            translator,
            config,
            source,
            target,
        }
    }

    /// Translate every string, preserving length and order. Never fails.
    pub async fn translate_all(&self, texts: &[String]) -> Vec<Translation> {
        let mut results: Vec<Translation> = texts.iter().map(|t| Translation::skipped(t)).collect();

        let eligible: Vec<usize> = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| trimmed_char_count(text) >= self.config.min_chars.max(1))
            .map(|(i, _)| i)
            .collect();

        if eligible.is_empty() {
            return results;
        }

        if self.translator.info().supports_batch {
            self.translate_keyed(texts, &eligible, &mut results).await;
        } else {
            self.translate_parallel(texts, &eligible, &mut results).await;
        }

        let fallbacks = results
            .iter()
            .filter(|t| t.status == TranslationStatus::Fallback)
            .count();
        debug!(
            "Translated {} strings ({} eligible, {} fell back) with {}",
            texts.len(),
            eligible.len(),
            fallbacks,
            self.translator.name()
        );
        results
    }

    /// One keyed request per batch, batches in sequence.
    async fn translate_keyed(
        &self,
        texts: &[String],
        eligible: &[usize],
        results: &mut [Translation],
    ) {
        let batch_size = self.config.batch_size.max(1);

        for (batch_no, chunk) in eligible.chunks(batch_size).enumerate() {
            if batch_no > 0 && self.config.inter_batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.inter_batch_delay_ms)).await;
            }

            let entries: Vec<(usize, &str)> = chunk
                .iter()
                .enumerate()
                .map(|(key, &i)| (key, texts[i].as_str()))
                .collect();

            let reply = self
                .with_retry(|| {
                    self.translator
                        .translate_keyed(&entries, &self.source, &self.target)
                })
                .await;

            let values = match reply {
                Ok(value) => match validate_keyed(&value, chunk.len()) {
                    Some(values) => values,
                    None => {
                        warn!(
                            "Batch {}: reply is not a JSON object, keeping source text",
                            batch_no
                        );
                        vec![None; chunk.len()]
                    }
                },
                Err(e) => {
                    warn!("Batch {} failed, keeping source text: {}", batch_no, e);
                    vec![None; chunk.len()]
                }
            };

            for (&i, value) in chunk.iter().zip(values) {
                results[i] = match value {
                    Some(text) => Translation::translated(text),
                    None => Translation::fallback(&texts[i]),
                };
            }
        }
    }

    /// One request per string, at most `workers` in flight, results in input order.
    async fn translate_parallel(
        &self,
        texts: &[String],
        eligible: &[usize],
        results: &mut [Translation],
    ) {
        let requests = eligible.iter().map(|&i| {
            let text = texts[i].as_str();
            async move {
                let outcome = self
                    .with_retry(|| self.translator.translate(text, &self.source, &self.target))
                    .await;
                (i, outcome)
            }
        });

        let outcomes: Vec<(usize, Result<String>)> = stream::iter(requests)
            .buffered(self.config.workers.max(1))
            .collect()
            .await;

        for (i, outcome) in outcomes {
            results[i] = match outcome {
                Ok(text) if !text.trim().is_empty() => Translation::translated(text),
                Ok(_) => {
                    warn!("String {} came back empty, keeping source text", i);
                    Translation::fallback(&texts[i])
                }
                Err(e) => {
                    warn!("String {} failed, keeping source text: {}", i, e);
                    Translation::fallback(&texts[i])
                }
            };
        }
    }

    /// Run `op`, retrying rate limits and timeouts up to the policy's cap.
    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < self.retry.attempts => {
                    let delay = self.retry.delay_after(&e, attempt);
                    warn!(
                        "Attempt {}/{} failed ({}), retrying in {:?}",
                        attempt + 1,
                        self.retry.attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Check a keyed reply against the keys `0..count`.
///
/// Returns `None` when the reply is not a JSON object at all. Otherwise each
/// requested key maps to its translation, or `None` when the key is missing,
/// its value is not a string, or the string is blank. Keys that were not
/// requested are logged and ignored.
pub fn validate_keyed(value: &serde_json::Value, count: usize) -> Option<Vec<Option<String>>> {
    let object = value.as_object()?;
    let mut values = vec![None; count];

    for (key, entry) in object {
        let Some(index) = key.trim().parse::<usize>().ok().filter(|&i| i < count) else {
            warn!("Ignoring unexpected key {:?} in batch reply", key);
            continue;
        };
        match entry.as_str() {
            Some(text) if !text.trim().is_empty() => values[index] = Some(text.to_string()),
            _ => warn!("Key {} has no usable translation", index),
        }
    }
    Some(values)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::translator::TranslatorInfo;

    /// Keyed translator that answers with a canned reply per call.
    struct KeyedMock {
        replies: Mutex<Vec<Result<Value>>>,
        calls: AtomicUsize,
        batch_sizes: Mutex<Vec<usize>>,
    }

    impl KeyedMock {
        fn new(replies: Vec<Result<Value>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
                batch_sizes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Translator for KeyedMock {
        fn info(&self) -> TranslatorInfo {
            TranslatorInfo {
                name: "Keyed mock",
                requires_api_key: false,
                supports_batch: true,
            }
        }

        async fn translate(&self, _text: &str, _source: &Lang, _target: &Lang) -> Result<String> {
            unreachable!("keyed backends are only called in batches")
        }

        async fn translate_keyed(
            &self,
            entries: &[(usize, &str)],
            _source: &Lang,
            _target: &Lang,
        ) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batch_sizes.lock().unwrap().push(entries.len());
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                // Echo every entry upper-cased
                let map: serde_json::Map<String, Value> = entries
                    .iter()
                    .map(|(k, t)| (k.to_string(), Value::from(t.to_uppercase())))
                    .collect();
                return Ok(Value::Object(map));
            }
            replies.remove(0)
        }
    }

    /// Single-string translator that reverses its input, slower for early indices.
    struct SingleMock {
        calls: AtomicUsize,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl Translator for SingleMock {
        fn info(&self) -> TranslatorInfo {
            TranslatorInfo {
                name: "Single mock",
                requires_api_key: false,
                supports_batch: false,
            }
        }

        async fn translate(&self, text: &str, _source: &Lang, _target: &Lang) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(text) == self.fail_on {
                return Err(Error::TranslationRequest("HTTP 500: boom".to_string()));
            }
            let delay = 20u64.saturating_sub(text.len() as u64 * 3);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(text.chars().rev().collect())
        }
    }

    fn fast_config() -> BatchConfig {
        BatchConfig {
            backoff_base_ms: 1,
            inter_batch_delay_ms: 0,
            ..BatchConfig::default()
        }
    }

    fn batch(translator: Arc<dyn Translator>, config: BatchConfig) -> BatchTranslator {
        BatchTranslator::new(translator, config, Lang::new("en"), Lang::new("ar"))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_retry_policy_delays() {
        let linear = RetryPolicy {
            attempts: 3,
            backoff: Backoff::Linear,
            base_ms: 5000,
            max_delay_ms: 60_000,
        };
        assert_eq!(linear.delay_for(0), Duration::from_secs(5));
        assert_eq!(linear.delay_for(2), Duration::from_secs(15));

        let exponential = RetryPolicy {
            backoff: Backoff::Exponential,
            base_ms: 100,
            ..linear
        };
        assert_eq!(exponential.delay_for(0), Duration::from_millis(100));
        assert_eq!(exponential.delay_for(3), Duration::from_millis(800));
        // Saturates, then the cap applies
        assert_eq!(exponential.delay_for(200), Duration::from_secs(60));
    }

    #[test]
    fn test_server_retry_after_is_capped() {
        let policy = RetryPolicy {
            attempts: 3,
            backoff: Backoff::Linear,
            base_ms: 10,
            max_delay_ms: 30_000,
        };
        let short = Error::TranslationRateLimited { retry_after: Some(2) };
        let long = Error::TranslationRateLimited {
            retry_after: Some(3600),
        };
        assert_eq!(policy.delay_after(&short, 0), Duration::from_secs(2));
        assert_eq!(policy.delay_after(&long, 0), Duration::from_secs(30));
        assert_eq!(policy.delay_after(&Error::TranslationTimeout, 1), Duration::from_millis(20));
    }

    #[test]
    fn test_validate_keyed() {
        let value = json!({"0": "a", "2": 7, "5": "extra", "x": "junk", "3": "  "});
        let values = validate_keyed(&value, 4).unwrap();
        assert_eq!(values, vec![Some("a".to_string()), None, None, None]);

        assert!(validate_keyed(&json!(["a", "b"]), 2).is_none());
    }

    #[tokio::test]
    async fn test_keyed_preserves_length_and_order() {
        let mock = Arc::new(KeyedMock::new(Vec::new()));
        let config = BatchConfig {
            batch_size: 2,
            ..fast_config()
        };
        let texts = strings(&["alpha", "", "beta", "x", "gamma", "delta", "   "]);
        let out = batch(mock.clone(), config).translate_all(&texts).await;

        assert_eq!(out.len(), texts.len());
        let got: Vec<&str> = out.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(got, vec!["ALPHA", "", "BETA", "x", "GAMMA", "DELTA", "   "]);
        assert_eq!(out[1].status, TranslationStatus::Skipped);
        assert_eq!(out[3].status, TranslationStatus::Skipped);
        assert_eq!(out[0].status, TranslationStatus::Translated);
        // 4 eligible strings in batches of 2
        assert_eq!(*mock.batch_sizes.lock().unwrap(), vec![2, 2]);
    }

    #[tokio::test]
    async fn test_keyed_missing_and_extra_keys_fall_back_per_index() {
        let mock = Arc::new(KeyedMock::new(vec![Ok(json!({
            "0": "واحد",
            "2": {"nested": true},
            "9": "ignored"
        }))]));
        let texts = strings(&["one", "two", "three"]);
        let out = batch(mock, fast_config()).translate_all(&texts).await;

        assert_eq!(out[0], Translation::translated("واحد".to_string()));
        assert_eq!(out[1], Translation::fallback("two"));
        assert_eq!(out[2], Translation::fallback("three"));
    }

    #[tokio::test]
    async fn test_non_object_reply_falls_back_whole_batch() {
        let mock = Arc::new(KeyedMock::new(vec![Ok(json!("not an object"))]));
        let texts = strings(&["one", "two"]);
        let out = batch(mock, fast_config()).translate_all(&texts).await;
        assert!(out.iter().all(|t| t.status == TranslationStatus::Fallback));
        assert_eq!(out[1].text, "two");
    }

    #[tokio::test]
    async fn test_rate_limit_every_attempt_stops_at_cap() {
        let replies = (0..10)
            .map(|_| Err(Error::TranslationRequest("429 RESOURCE_EXHAUSTED".to_string())))
            .collect();
        let mock = Arc::new(KeyedMock::new(replies));
        let config = BatchConfig {
            retry_count: 4,
            ..fast_config()
        };
        let texts = strings(&["Hello", "World"]);
        let out = batch(mock.clone(), config).translate_all(&texts).await;

        assert_eq!(mock.calls.load(Ordering::SeqCst), 4);
        assert_eq!(out, vec![Translation::fallback("Hello"), Translation::fallback("World")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_retry_after_does_not_stall_batch() {
        let replies = (0..3)
            .map(|_| {
                Err(Error::TranslationRateLimited {
                    retry_after: Some(3600),
                })
            })
            .collect();
        let mock = Arc::new(KeyedMock::new(replies));
        let config = BatchConfig {
            max_retry_delay_ms: 30_000,
            ..fast_config()
        };
        let texts = strings(&["Hello"]);

        let started = tokio::time::Instant::now();
        let out = batch(mock.clone(), config).translate_all(&texts).await;
        let waited = started.elapsed();

        assert_eq!(mock.calls.load(Ordering::SeqCst), 3);
        assert_eq!(out, vec![Translation::fallback("Hello")]);
        // Two capped waits between three attempts
        assert!(waited >= Duration::from_secs(60));
        assert!(waited < Duration::from_secs(61));
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let mock = Arc::new(KeyedMock::new(vec![
            Err(Error::TranslationRateLimited { retry_after: None }),
            Err(Error::TranslationTimeout),
        ]));
        let texts = strings(&["Hello"]);
        let out = batch(mock.clone(), fast_config()).translate_all(&texts).await;

        assert_eq!(mock.calls.load(Ordering::SeqCst), 3);
        assert_eq!(out[0], Translation::translated("HELLO".to_string()));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let mock = Arc::new(KeyedMock::new(vec![Err(Error::TranslationInvalidResponse(
            "reply is not JSON".to_string(),
        ))]));
        let texts = strings(&["Hello"]);
        let out = batch(mock.clone(), fast_config()).translate_all(&texts).await;

        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
        assert_eq!(out[0].status, TranslationStatus::Fallback);
    }

    #[tokio::test]
    async fn test_parallel_mode_keeps_input_order() {
        let mock = Arc::new(SingleMock {
            calls: AtomicUsize::new(0),
            fail_on: Some("fails"),
        });
        let config = BatchConfig {
            workers: 3,
            ..fast_config()
        };
        let texts = strings(&["ab", "abcd", "a", "fails", "abcdef", "xyz"]);
        let out = batch(mock.clone(), config).translate_all(&texts).await;

        let got: Vec<&str> = out.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(got, vec!["ba", "dcba", "a", "fails", "fedcba", "zyx"]);
        assert_eq!(out[2].status, TranslationStatus::Skipped);
        assert_eq!(out[3].status, TranslationStatus::Fallback);
        // "a" is too short to send
        assert_eq!(mock.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_all_skipped_makes_no_requests() {
        let mock = Arc::new(KeyedMock::new(Vec::new()));
        let texts = strings(&["", " ", "a"]);
        let out = batch(mock.clone(), fast_config()).translate_all(&texts).await;
        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
        assert!(out.iter().all(|t| t.status == TranslationStatus::Skipped));
    }
}
