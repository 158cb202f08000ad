//! Tarjama Web - HTTP service translating uploaded PDFs into Arabic.

mod helpers;
mod routes;
mod state;

#[cfg(test)]
#[allow(dead_code)]
#[path = "../../tarjama-core/src/test_support.rs"]
mod fixtures;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tarjama_core::{AppConfig, BackendKind};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "tarjama-web")]
#[command(author, version, about = "Tarjama PDF translation server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Translation backend (gemini, openai, google-free)
    #[arg(long)]
    backend: Option<String>,

    /// Arabic-capable TrueType font
    #[arg(long)]
    font: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},mupdf=warn")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    if let Some(ref backend) = args.backend {
        config.translator.backend = backend.parse::<BackendKind>()?;
    }
    if let Some(ref font) = args.font {
        config.render.font_path.clone_from(font);
    }
    config.translator = config.translator.with_env_api_key();

    // Refuse to start without a usable font or API key
    let state = Arc::new(AppState::new(config)?);
    info!(
        "Using {} with font {}",
        state.translator.translator_info().name,
        state.translator.font().base_name()
    );

    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
