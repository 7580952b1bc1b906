//! Config command - manage configuration files

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use lectern_core::config::{sample_config, ConfigFile};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the path to the config file
    Path,

    /// Show the current configuration and the settings it resolves to
    Show,

    /// Generate a default config file
    Init {
        /// Force overwrite if file exists
        #[arg(short, long)]
        force: bool,
    },

    /// Print a sample configuration to stdout
    Sample,
}

/// Run config subcommand
pub async fn config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Path => {
            let path = ConfigFile::default_path();
            println!("{}", path.display());
            if path.exists() {
                println!("(file exists)");
            } else {
                println!("(file does not exist)");
            }
        }
        ConfigCommand::Show => {
            let path = ConfigFile::default_path();
            let file = if path.exists() {
                let content =
                    std::fs::read_to_string(&path).context("Failed to read config file")?;
                println!("Configuration file: {}\n", path.display());
                println!("{}", content);
                ConfigFile::load_from(path).context("Failed to load config file")?
            } else {
                println!("No configuration file found at: {}", path.display());
                println!();
                println!("Using default settings. Create a config file with:");
                println!("  lectern config init");
                println!();
                ConfigFile::default()
            };

            let settings = file
                .to_recorder_config()
                .context("Configuration is invalid")?;
            println!("Effective settings:");
            println!("  Quality:        {}", settings.quality);
            println!(
                "  Audio:          {}",
                if settings.audio_enabled { "on" } else { "off" }
            );
            println!("  Screen FPS:     {}", settings.screen_fps);
            println!("  Flush interval: {}ms", settings.flush_interval.as_millis());
            println!("  Tick interval:  {}ms", settings.tick_interval.as_millis());
            println!("  Downloads:      {}", settings.download_dir().display());
        }
        ConfigCommand::Init { force } => {
            let path = ConfigFile::default_path();

            if path.exists() && !force {
                println!("Configuration file already exists: {}", path.display());
                println!();
                println!("Use --force to overwrite, or edit the existing file.");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent).context("Failed to create config directory")?;
                }
            }

            std::fs::write(&path, sample_config()).context("Failed to write config file")?;

            println!("Created configuration file: {}", path.display());
            println!();
            println!("Edit this file to change recording defaults.");
        }
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
    }

    Ok(())
}
