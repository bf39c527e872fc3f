use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use showcase_core::AppConfig;

mod commands;
mod tour;

#[derive(Parser)]
#[command(name = "showcase")]
#[command(author, version, about = "Play scripted showcase tours against simulated targets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a tour file
    Run {
        /// Path to the tour file
        tour: PathBuf,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Validate a tour file and report its step counts
    Check {
        /// Path to the tour file
        tour: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Run { tour, json } => commands::run::run(&config, &tour, json).await,
        Commands::Check { tour } => commands::check::run(&tour).await,
    }
}
