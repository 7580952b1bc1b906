//! Lectern CLI
//!
//! Drive camera, screen and microphone recording sessions from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Check which capture modes the environment supports
//! lectern probe
//!
//! # Record 10 seconds of screen, pausing at 4s for 2s, and download it
//! lectern record --mode screen --title "Week 1" --duration 10 --pause-at 4 -o ./out
//!
//! # Create a config file
//! lectern config init
//! ```

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Lectern - recording sessions for course content
#[derive(Parser)]
#[command(name = "lectern")]
#[command(version)]
#[command(about = "Camera, screen and audio recording sessions for course content", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a session against the simulated media environment
    #[command(alias = "rec")]
    Record(commands::RecordArgs),

    /// Show which capture modes and formats are available
    Probe(commands::ProbeArgs),

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(
            format!("lectern_core={}", level)
                .parse()
                .context("Invalid log directive")?,
        )
        .add_directive(
            format!("lectern={}", level)
                .parse()
                .context("Invalid log directive")?,
        );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Record(args) => commands::record(args).await?,
        Commands::Probe(args) => commands::probe(args).await?,
        Commands::Config(args) => commands::config(args).await?,
    }

    Ok(())
}
