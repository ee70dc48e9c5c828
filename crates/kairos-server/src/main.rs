mod prompt;
mod routes;
mod upstream;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kairos_core::{Config, GeminiClient};
use tracing_subscriber::EnvFilter;

use crate::prompt::KAIROS_SYSTEM_PROMPT;
use crate::routes::{router, AppState};

#[derive(Parser)]
#[command(name = "kairos-server")]
#[command(about = "Relay endpoint for the Kairos chat assistant")]
#[command(version)]
struct Cli {
    /// Address to listen on (overrides KAIROS_LISTEN and the config file)
    #[arg(short, long)]
    listen: Option<String>,

    /// Config file path
    #[arg(short, long, env = "KAIROS_CONFIG")]
    config: Option<PathBuf>,

    /// Gemini model name
    #[arg(short, long)]
    model: Option<String>,

    /// Origin allowed to call the relay from a browser
    #[arg(long)]
    allowed_origin: Option<String>,
}

/// INFO for the relay itself, WARN for everything else unless RUST_LOG says otherwise
fn log_filter(base: EnvFilter) -> EnvFilter {
    base.add_directive(tracing::Level::WARN.into()).add_directive(
        "kairos_server=info"
            .parse()
            .unwrap_or_else(|_| tracing::Level::INFO.into()),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(EnvFilter::from_default_env()))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load config")?;

    let api_key = config.gemini_api_key().unwrap_or_else(|| {
        tracing::warn!("GEMINI_API_KEY is not configured, upstream requests will fail");
        String::new()
    });
    let model = cli.model.unwrap_or_else(|| config.model());
    let gemini = GeminiClient::new(&api_key).with_model(&model);

    let system_prompt = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| KAIROS_SYSTEM_PROMPT.to_string());
    let allowed_origin = cli.allowed_origin.or_else(|| config.allowed_origin.clone());

    let state = AppState::new(Arc::new(gemini), &system_prompt);
    let app = router(state, allowed_origin.as_deref());

    let addr = cli.listen.unwrap_or_else(|| config.listen_addr());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, %model, "kairos relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
