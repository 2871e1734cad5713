use anyhow::{Context, Result};
use clap::Parser;

mod app;
mod chat;
mod client;
mod config;
mod decode;
mod ui;

use client::ChatClient;
use config::Config;
use ui::conversation::ConversationManager;

#[derive(Parser)]
#[command(name = "chatflow")]
#[command(version)]
#[command(about = "Terminal chat with streamed replies", long_about = None)]
struct Cli {
    /// Chat endpoint to send conversations to (overrides the config file)
    #[arg(long)]
    endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }

    init_logging(&config)?;
    tracing::info!(endpoint = %config.endpoint, "starting chatflow");

    let client = ChatClient::new(config.endpoint.clone());
    let manager = ConversationManager::new(client, config.suggested_prompts.clone());

    app::run(manager).await
}

/// The TUI owns the terminal, so diagnostics go to a log file instead.
fn init_logging(config: &Config) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();

    Ok(())
}
