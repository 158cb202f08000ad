//! Tarjama CLI - translate a PDF document into Arabic from the command line.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tarjama_core::{
    AppConfig, BackendKind, Canvas, Lang, PageLayout, PdfDocument, PdfTranslator, ProgressCallback,
    TextColor, TranslateOptions, util::output_path_for,
};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendOption {
    Gemini,
    Openai,
    GoogleFree,
}

impl From<BackendOption> for BackendKind {
    fn from(opt: BackendOption) -> Self {
        match opt {
            BackendOption::Gemini => Self::Gemini,
            BackendOption::Openai => Self::OpenAi,
            BackendOption::GoogleFree => Self::GoogleFree,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutOption {
    Overwrite,
    Interleaved,
    Appended,
}

impl From<LayoutOption> for PageLayout {
    fn from(opt: LayoutOption) -> Self {
        match opt {
            LayoutOption::Overwrite => Self::Overwrite,
            LayoutOption::Interleaved => Self::Interleaved,
            LayoutOption::Appended => Self::Appended,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CanvasOption {
    Original,
    Blank,
}

impl From<CanvasOption> for Canvas {
    fn from(opt: CanvasOption) -> Self {
        match opt {
            CanvasOption::Original => Self::Original,
            CanvasOption::Blank => Self::Blank,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Black,
    DarkRed,
    Blue,
}

impl From<ColorOption> for TextColor {
    fn from(opt: ColorOption) -> Self {
        match opt {
            ColorOption::Black => Self::black(),
            ColorOption::DarkRed => Self::dark_red(),
            ColorOption::Blue => Self::blue(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "tarjama")]
#[command(author, version, about = "Translate PDF documents into Arabic", long_about = None)]
struct Args {
    /// Input PDF file
    #[arg(required_unless_present = "print_config")]
    input: Option<PathBuf>,

    /// Output PDF file (default: input-<target>.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Translation backend
    #[arg(short, long, value_enum)]
    backend: Option<BackendOption>,

    /// Output page layout
    #[arg(short, long, value_enum)]
    layout: Option<LayoutOption>,

    /// What translated copies are drawn on (interleaved/appended only)
    #[arg(long, value_enum)]
    canvas: Option<CanvasOption>,

    /// Arabic-capable TrueType font
    #[arg(long)]
    font: Option<PathBuf>,

    /// Translate only specific pages (e.g., "1-5" or "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Strings per keyed request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Parallel requests for single-string backends
    #[arg(long)]
    workers: Option<usize>,

    /// Source language code
    #[arg(short = 's', long)]
    source: Option<String>,

    /// Target language code
    #[arg(short = 't', long)]
    target: Option<String>,

    /// API key (default: GEMINI_API_KEY or OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// API base URL
    #[arg(long)]
    api_base: Option<String>,

    /// Translated text color
    #[arg(long, value_enum)]
    color: Option<ColorOption>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    /// Layer command line flags over the loaded configuration.
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(backend) = self.backend {
            config.translator.backend = backend.into();
        }
        if let Some(layout) = self.layout {
            config.layout = layout.into();
        }
        if let Some(canvas) = self.canvas {
            config.canvas = canvas.into();
        }
        if let Some(ref font) = self.font {
            config.render.font_path.clone_from(font);
        }
        if let Some(batch_size) = self.batch_size {
            config.batch.batch_size = batch_size;
        }
        if let Some(workers) = self.workers {
            config.batch.workers = workers;
        }
        if let Some(ref source) = self.source {
            config.source_lang = Lang::new(source);
        }
        if let Some(ref target) = self.target {
            config.target_lang = Lang::new(target);
        }
        if let Some(ref key) = self.api_key {
            config.translator.api_key = Some(key.clone());
        }
        if let Some(ref model) = self.model {
            config.translator.model = Some(model.clone());
        }
        if let Some(ref base) = self.api_base {
            config.translator.api_base = Some(base.clone());
        }
        if let Some(color) = self.color {
            config.render.text_color = color.into();
        }
    }
}

fn parse_page_range(pages: &str, total: usize) -> Result<Vec<usize>> {
    let mut result = Vec::new();

    for part in pages.split(',') {
        let part = part.trim();
        if part.contains('-') {
            let range: Vec<&str> = part.split('-').collect();
            if range.len() == 2 {
                let start: usize = range[0].trim().parse().context("Invalid page range start")?;
                let end: usize = range[1].trim().parse().context("Invalid page range end")?;
                for p in start..=end {
                    if p > 0 && p <= total {
                        result.push(p - 1); // Convert to 0-indexed
                    }
                }
            }
        } else {
            let page: usize = part.parse().context("Invalid page number")?;
            if page > 0 && page <= total {
                result.push(page - 1); // Convert to 0-indexed
            }
        }
    }

    result.sort_unstable();
    result.dedup();
    Ok(result)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    args.apply_to(&mut config);
    config.translator = config.translator.with_env_api_key();
    config.validate().context("Invalid configuration")?;

    if args.print_config {
        // CLI output is intentional
        #[allow(clippy::print_stdout)]
        {
            print!("{}", config.to_toml()?);
        }
        return Ok(());
    }

    let Some(input) = args.input.as_ref() else {
        anyhow::bail!("No input file given");
    };

    // Fails early on a missing font or API key
    let translator =
        PdfTranslator::new(config.clone()).context("Failed to initialize translator")?;

    // Load input PDF
    info!("Loading PDF: {}", input.display());
    let doc = PdfDocument::from_file(input)
        .context(format!("Failed to load PDF: {}", input.display()))?;

    let total_pages = doc.page_count();
    info!("Document has {} pages", total_pages);

    // Determine which pages to translate
    let pages = if let Some(ref page_spec) = args.pages {
        parse_page_range(page_spec, total_pages)?
    } else {
        (0..total_pages).collect()
    };

    if pages.is_empty() {
        anyhow::bail!("No valid pages to translate");
    }

    info!(
        "Translating {} pages with {}",
        pages.len(),
        translator.translator_info().name
    );

    // Setup progress bar
    #[allow(clippy::cast_possible_truncation)]
    let pb = ProgressBar::new(pages.len() as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let bar = pb.clone();
    #[allow(clippy::cast_possible_truncation)]
    let progress: ProgressCallback = Box::new(move |done: usize, _total: usize| {
        bar.set_position(done as u64);
    });

    let options = TranslateOptions {
        layout: config.layout,
        canvas: config.canvas,
        pages: Some(pages),
    };
    let result = translator
        .translate_with(&doc, &options, Some(progress))
        .await
        .context("Failed to translate document")?;

    pb.finish_with_message("Translation complete");

    let fallback: usize = result.pages.iter().map(|p| p.fallback).sum();
    let skipped_spans: usize = result.pages.iter().map(|p| p.render.skipped).sum();
    if fallback > 0 {
        warn!("{} spans could not be translated and kept their source text", fallback);
    }
    if skipped_spans > 0 {
        warn!("{} spans could not be drawn", skipped_spans);
    }

    // Determine output path
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| output_path_for(input, config.target_lang.as_str()));

    // Save output
    std::fs::write(&output_path, &result.pdf_bytes)
        .context(format!("Failed to write output: {}", output_path.display()))?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!(
            "Translated PDF saved to: {} ({} pages)",
            output_path.display(),
            result.page_count
        );
    }

    Ok(())
}
