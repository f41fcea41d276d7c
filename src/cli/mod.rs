//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod init;
mod serve;
mod tags;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "docinbox")]
#[command(about = "Keyboard-driven triage of untagged godocs documents")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: ./docinbox.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Write an example config file
    Init,

    /// Start the triage web server
    Serve {
        /// Listen address (overrides config), e.g. 127.0.0.1:9090
        #[arg(long)]
        addr: Option<String>,
    },

    /// List the tags defined on the godocs server
    Tags,
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path();

    match cli.command {
        Commands::Init => init::cmd_init(&config_path),
        Commands::Serve { addr } => {
            let config = load_config(&config_path).await?;
            serve::cmd_serve(config, addr).await
        }
        Commands::Tags => {
            let config = load_config(&config_path).await?;
            tags::cmd_tags(&config).await
        }
    }
}

async fn load_config(path: &std::path::Path) -> anyhow::Result<Config> {
    if !path.exists() {
        anyhow::bail!(
            "Config file {} not found; run `docinbox init` to create one",
            path.display()
        );
    }
    Ok(Config::load_from_path(path).await?)
}
