//! Binary entry point that loads configuration, sets up logging and launches
//! the voice assistant loop or the one-time Gmail authorization flow.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

use vocalis::config::{AppConfig, DEFAULT_CONFIG_PATH};
use vocalis::services::{oauth, SystemBrowser};
use vocalis::{assistant, listener};

#[derive(Parser)]
#[command(name = "vocalis", version, about = "Keyword-driven voice assistant")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Read commands from standard input instead of the microphone
    #[arg(long)]
    typed: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the assistant (default)
    Run,
    /// Authorize Gmail access and store the token
    Authorize,
}

#[tokio::main]
/// Bootstraps environment variables and logging, then dispatches the chosen command.
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config);
    tracing::debug!(?config, "Configuration loaded");

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let listener = listener::default_listener(&config, cli.typed);
            assistant::run_voice_assistant(&config, listener).await
        }
        Command::Authorize => {
            oauth::authorize(
                &config.gmail_credentials_path,
                &config.gmail_token_path,
                &SystemBrowser,
            )
            .await
        }
    }
}
