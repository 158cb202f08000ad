use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Language codes following ISO 639-1 with regional variants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable name used in LLM prompts.
    pub fn display_name(&self) -> &'static str {
        match self.as_str() {
            "en" => "English",
            "ar" => "Arabic",
            "fa" => "Persian",
            "ur" => "Urdu",
            "fr" => "French",
            "de" => "German",
            "es" => "Spanish",
            "it" => "Italian",
            "pt" => "Portuguese",
            "ru" => "Russian",
            "tr" => "Turkish",
            "zh-CN" => "Simplified Chinese",
            "ja" => "Japanese",
            // LLMs understand most ISO codes anyway
            _ => "the specified language",
        }
    }
}

fn default_source_lang() -> Lang {
    Lang::new(DEFAULT_SOURCE_LANG)
}

fn default_target_lang() -> Lang {
    Lang::new(DEFAULT_TARGET_LANG)
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Default source language code
pub const DEFAULT_SOURCE_LANG: &str = "en";
/// Default target language code
pub const DEFAULT_TARGET_LANG: &str = "ar";
/// Default font file, looked up relative to the working directory
pub const DEFAULT_FONT_PATH: &str = "Amiri-Regular.ttf";

/// RGB color with components in 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl TextColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub const fn white() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    pub const fn dark_red() -> Self {
        Self::new(0.8, 0.0, 0.0)
    }

    pub const fn blue() -> Self {
        Self::new(0.0, 0.0, 0.8)
    }

    /// PDF content stream operand triple, e.g. `0 0 0`
    pub fn to_pdf_operands(self) -> String {
        format!(
            "{} {} {}",
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0)
        )
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::black()
    }
}

// =============================================================================
// Translator
// =============================================================================

/// Which translation service to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Google Gemini `generateContent` (needs an API key)
    #[default]
    Gemini,
    /// Any OpenAI-compatible chat completions server
    #[serde(alias = "openai")]
    OpenAi,
    /// Free Google Translate endpoint, one string per request
    GoogleFree,
}

impl BackendKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "open-ai",
            Self::GoogleFree => "google-free",
        }
    }

    pub const fn default_api_base(self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::OpenAi => "http://localhost:8080/v1",
            Self::GoogleFree => "https://translate.googleapis.com",
        }
    }

    /// Environment variable conventionally holding this backend's key
    pub const fn api_key_env(self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::GoogleFree => None,
        }
    }

    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash",
            Self::OpenAi => "default_model",
            Self::GoogleFree => "",
        }
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" | "open-ai" => Ok(Self::OpenAi),
            "google-free" | "google" | "free" => Ok(Self::GoogleFree),
            other => Err(Error::ConfigInvalid {
                field: "translator.backend".to_string(),
                reason: format!("unknown backend '{other}'"),
            }),
        }
    }
}

/// Translator backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Overrides the backend's default endpoint
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Overrides the backend's default model
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl TranslatorConfig {
    pub fn new(backend: BackendKind, api_key: Option<String>) -> Self {
        Self {
            backend,
            api_key,
            ..Self::default()
        }
    }

    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.backend.default_api_base())
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.backend.default_model())
    }

    /// Fill a missing key from the backend's environment variable.
    #[must_use]
    pub fn with_env_api_key(mut self) -> Self {
        if self.api_key.as_deref().is_none_or(|k| k.trim().is_empty())
            && let Some(var) = self.backend.api_key_env()
        {
            self.api_key = std::env::var(var).ok().filter(|k| !k.trim().is_empty());
        }
        self
    }
}

const fn default_timeout_secs() -> u64 {
    60
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            api_base: None,
            api_key: None,
            model: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// =============================================================================
// Batching & retry
// =============================================================================

/// How the wait between retries grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backoff {
    /// `base * (attempt + 1)`
    #[default]
    Linear,
    /// `base * 2^attempt`
    Exponential,
}

/// Batching, retry and fan-out policy for translation requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Strings per keyed request (LLM backends)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Strings shorter than this (after trimming) are passed through
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    /// Total attempts per request, including the first
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default)]
    pub backoff: Backoff,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Longest single wait between attempts, including server `Retry-After`
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    /// Pause between consecutive keyed batches
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
    /// Requests in flight for single-string backends
    #[serde(default = "default_workers")]
    pub workers: usize,
}

const fn default_batch_size() -> usize {
    20
}

const fn default_min_chars() -> usize {
    2
}

const fn default_retry_count() -> u32 {
    3
}

const fn default_backoff_base_ms() -> u64 {
    5000
}

const fn default_max_retry_delay_ms() -> u64 {
    60_000
}

const fn default_inter_batch_delay_ms() -> u64 {
    1000
}

const fn default_workers() -> usize {
    8
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            min_chars: default_min_chars(),
            retry_count: default_retry_count(),
            backoff: Backoff::default(),
            backoff_base_ms: default_backoff_base_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
            workers: default_workers(),
        }
    }
}

// =============================================================================
// Rendering & layout
// =============================================================================

/// Where the shaped text starts inside the span's box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    /// Left edge of the original box, like the source text
    #[default]
    Start,
    /// Flush with the right edge of the original box
    End,
}

/// Overlay rendering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// TrueType font with Arabic coverage
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,
    #[serde(default)]
    pub text_color: TextColor,
    #[serde(default = "default_fill_color")]
    pub fill_color: TextColor,
    #[serde(default)]
    pub align: TextAlign,
    /// Shrink text that is wider than the original box
    #[serde(default = "default_true")]
    pub fit_to_box: bool,
    /// Lower bound for the shrink factor
    #[serde(default = "default_min_font_scale")]
    pub min_font_scale: f32,
    /// Extra points around the blanking rectangle
    #[serde(default = "default_padding")]
    pub padding: f32,
    /// Keep Arabic diacritics instead of stripping them before shaping
    #[serde(default)]
    pub keep_harakat: bool,
}

fn default_font_path() -> PathBuf {
    PathBuf::from(DEFAULT_FONT_PATH)
}

const fn default_fill_color() -> TextColor {
    TextColor::white()
}

const fn default_true() -> bool {
    true
}

const fn default_min_font_scale() -> f32 {
    0.6
}

const fn default_padding() -> f32 {
    1.0
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: default_font_path(),
            text_color: TextColor::default(),
            fill_color: default_fill_color(),
            align: TextAlign::default(),
            fit_to_box: true,
            min_font_scale: default_min_font_scale(),
            padding: default_padding(),
            keep_harakat: false,
        }
    }
}

/// Output page ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageLayout {
    /// One page per source page, original text overwritten in place
    #[default]
    Overwrite,
    /// Original page followed by its translated copy
    Interleaved,
    /// Whole original document, then all translated copies
    Appended,
}

impl FromStr for PageLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "interleaved" | "side-by-side" => Ok(Self::Interleaved),
            "appended" => Ok(Self::Appended),
            other => Err(Error::ConfigInvalid {
                field: "layout".to_string(),
                reason: format!("unknown layout '{other}'"),
            }),
        }
    }
}

/// What a translated copy is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Canvas {
    /// Copy of the source page, original text blanked out
    #[default]
    Original,
    /// Fresh empty page of the same size
    Blank,
}

impl FromStr for Canvas {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "blank" => Ok(Self::Blank),
            other => Err(Error::ConfigInvalid {
                field: "canvas".to_string(),
                reason: format!("unknown canvas '{other}'"),
            }),
        }
    }
}

// =============================================================================
// Application
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source language
    #[serde(default = "default_source_lang")]
    pub source_lang: Lang,

    /// Target language
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// Output page ordering
    #[serde(default)]
    pub layout: PageLayout,

    /// Background of translated copies (ignored by `overwrite`)
    #[serde(default)]
    pub canvas: Canvas,

    /// Translator backend configuration
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Batching and retry policy
    #[serde(default)]
    pub batch: BatchConfig,

    /// Overlay rendering
    #[serde(default)]
    pub render: RenderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            layout: PageLayout::default(),
            canvas: Canvas::default(),
            translator: TranslatorConfig::default(),
            batch: BatchConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

/// Prefix for environment overrides, e.g. `TARJAMA_BATCH__BATCH_SIZE=30`
const ENV_PREFIX: &str = "TARJAMA";

impl AppConfig {
    /// Load configuration from a TOML file, layered with `TARJAMA_*` variables.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigLoad(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        Self::build(Some(path))
    }

    /// Load from default locations (~/.config/tarjama/config.toml, ./tarjama.toml)
    /// and the environment. Falls back to defaults when nothing loads.
    pub fn load() -> Self {
        let user_config = crate::util::config_dir()
            .map(|dir| dir.join("tarjama").join("config.toml"))
            .filter(|p| p.exists());
        let local_config = Some(PathBuf::from("tarjama.toml")).filter(|p| p.exists());

        let path = user_config.or(local_config);
        match Self::build(path.as_deref()) {
            Ok(config) => {
                match path {
                    Some(p) => tracing::debug!("Loaded config from {}", p.display()),
                    None => tracing::debug!("No config file found, using defaults"),
                }
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load config: {}", e);
                Self::default()
            }
        }
    }

    fn build(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::new(
                &path.to_string_lossy(),
                config::FileFormat::Toml,
            ));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| {
            Err(Error::ConfigInvalid {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };

        if !(1..=100).contains(&self.batch.batch_size) {
            return invalid("batch.batch_size", "must be between 1 and 100");
        }
        if self.batch.retry_count == 0 {
            return invalid("batch.retry_count", "must be at least 1");
        }
        if self.batch.max_retry_delay_ms < self.batch.backoff_base_ms {
            return invalid(
                "batch.max_retry_delay_ms",
                "must not be smaller than batch.backoff_base_ms",
            );
        }
        if self.batch.workers == 0 {
            return invalid("batch.workers", "must be at least 1");
        }
        if !(self.render.min_font_scale > 0.0 && self.render.min_font_scale <= 1.0) {
            return invalid("render.min_font_scale", "must be in (0, 1]");
        }
        if !self.render.padding.is_finite() || self.render.padding < 0.0 {
            return invalid("render.padding", "must be a non-negative number");
        }
        Ok(())
    }

    /// Render the configuration as TOML (for `--print-config`).
    ///
    /// A configured API key is shown as `<redacted>`.
    pub fn to_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.translator.api_key.is_some() {
            shown.translator.api_key = Some("<redacted>".to_string());
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| Error::ConfigLoad(format!("Failed to serialize config: {e}")))
    }
}
