//! Helpers shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lopdf::Document;
use tarjama_core::{
    AppConfig, BatchConfig, Error, Lang, RenderConfig, Result, Translator, TranslatorInfo,
};

#[path = "../../src/test_support.rs"]
pub mod fixtures;

/// Serialize an in-memory document.
pub fn save(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// One-page PDF reading `text` at (100, 700) in 24pt Helvetica.
pub fn single_page_pdf(text: &str) -> Vec<u8> {
    let (doc, _) = fixtures::single_page_document(text);
    save(doc)
}

/// Config with no delays so retries and batches run instantly.
pub fn fast_config() -> AppConfig {
    AppConfig {
        batch: BatchConfig {
            backoff_base_ms: 0,
            inter_batch_delay_ms: 0,
            ..BatchConfig::default()
        },
        render: RenderConfig {
            fit_to_box: false,
            ..RenderConfig::default()
        },
        ..AppConfig::default()
    }
}

/// Backend that never touches the network.
pub enum MockTranslator {
    /// Every string translates to this text
    Fixed(&'static str),
    /// Every request is rate limited
    RateLimited,
}

/// Wraps a mock and counts requests.
pub struct CountingTranslator {
    inner: MockTranslator,
    pub calls: AtomicUsize,
}

impl CountingTranslator {
    pub fn new(inner: MockTranslator) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for CountingTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "mock",
            requires_api_key: false,
            supports_batch: false,
        }
    }

    async fn translate(&self, _text: &str, _source: &Lang, _target: &Lang) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.inner {
            MockTranslator::Fixed(reply) => Ok(reply.to_string()),
            MockTranslator::RateLimited => Err(Error::TranslationRateLimited {
                retry_after: Some(0),
            }),
        }
    }
}
