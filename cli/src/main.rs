mod commands;
mod startup;
mod tui;

use aiterm_core::Config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fs;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aiterm")]
#[command(author, version, about = "Talk to a local language model from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Line-oriented chat on stdin/stdout (the default)
    Chat,

    /// Full-screen terminal interface
    Ui,

    /// View or set configuration
    Config {
        /// Config key (e.g., "model.mode", "inference.max_tokens")
        key: Option<String>,

        /// Value to set (if omitted, shows current value)
        value: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    init_logging(&command)?;

    match command {
        Commands::Chat => {
            commands::chat::execute().await?;
        }
        Commands::Ui => {
            tui::run().await?;
        }
        Commands::Config { key, value } => {
            commands::config::execute(key.as_deref(), value.as_deref()).await?;
        }
    }

    Ok(())
}

/// The full-screen variant owns the terminal, so it logs to a file. Everything
/// else logs warnings to stderr, out of the transcript's way.
fn init_logging(command: &Commands) -> Result<()> {
    match command {
        Commands::Ui => {
            let dir = Config::logs_dir()?;
            fs::create_dir_all(&dir)?;
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("aiterm.log"))?;

            tracing_subscriber::fmt()
                .with_env_filter(env_filter(tracing::Level::INFO))
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(tracing::Level::WARN))
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn env_filter(default: tracing::Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy()
}
