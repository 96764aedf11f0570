//! CLI for the mediabox media server.

mod commands;
mod http;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use mediabox_core::config::{self, ConfigStore};
use mediabox_core::logging;
use std::path::PathBuf;

use commands::{run_completions, run_formats, run_man, run_serve, run_worker};

/// Top-level CLI for mediabox.
#[derive(Debug, Parser)]
#[command(name = "mediabox")]
#[command(about = "mediabox: web front end for background media downloads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the HTTP server.
    Serve {
        /// Listen address; overrides `bind_addr` from config.toml.
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// List the selectable video and audio formats of a source.
    Formats {
        /// Source URL or identifier.
        url: String,
    },

    /// Print shell completions to stdout.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the man page (roff) to stdout.
    Man,

    /// Download one source, writing progress events to stdout. Launched by the server.
    #[command(hide = true)]
    Worker {
        /// Source URL or identifier.
        #[arg(long)]
        source: String,
        /// Output directory.
        #[arg(long)]
        dir: PathBuf,
        /// Downloader format selector.
        #[arg(long)]
        format: Option<String>,
        /// Playlist items to download, e.g. `1-3,7`.
        #[arg(long)]
        items: Option<String>,
    },
}

fn init_logging_or_stderr() {
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("log file unavailable, logging to stderr: {:#}", e);
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Worker {
                source,
                dir,
                format,
                items,
            } => {
                // No stderr fallback: stderr lines become job errors.
                let _ = logging::init_logging();
                let cfg = config::load_or_init().unwrap_or_else(|e| {
                    tracing::warn!("worker using default config: {:#}", e);
                    config::MediaboxConfig::default()
                });
                run_worker(&cfg, source, dir, format, items)?;
            }
            CliCommand::Serve { bind } => {
                init_logging_or_stderr();
                let store = ConfigStore::open_default()?;
                tracing::debug!("loaded config: {:?}", store.config());
                run_serve(store, bind).await?;
            }
            CliCommand::Formats { url } => {
                init_logging_or_stderr();
                let cfg = config::load_or_init()?;
                run_formats(&cfg, &url).await?;
            }
            CliCommand::Completions { shell } => run_completions(shell)?,
            CliCommand::Man => run_man()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
