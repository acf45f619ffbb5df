//! CodeClaw CLI: the main entry point.
//!
//! Commands:
//! - `agent`    Interactive session or single-message mode (the default)
//! - `status`   Show the effective configuration
//! - `doctor`   Diagnose config, session file, model and git
//! - `onboard`  Write a starter config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "codeclaw",
    about = "CodeClaw: a local natural-language coding assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Session file to load and save (overrides agent.session_file)
    #[arg(long, global = true, env = "CODECLAW_SESSION")]
    session: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the assistant
    Agent {
        /// Run a single request instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show the effective configuration
    Status,

    /// Diagnose system health
    Doctor,

    /// Create the config directory and a default config file
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Agent { message: None }) {
        Commands::Agent { message } => commands::agent::run(message, cli.session).await?,
        Commands::Status => commands::status::run(cli.session).await?,
        Commands::Doctor => commands::doctor::run(cli.session).await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
