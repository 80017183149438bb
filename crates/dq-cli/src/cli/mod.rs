//! CLI for the dq download queue.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dq_core::config;

use commands::{run_add, run_list, run_run};

/// Top-level CLI for the dq download queue.
#[derive(Debug, Parser)]
#[command(name = "dq")]
#[command(about = "dq: crash-resilient queue of auto-resuming downloads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Print the queued URLs in order.
    List,

    /// Append URLs to the download queue.
    Add {
        /// One or more HTTP(S) URLs.
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Process the queue, one download at a time, until interrupted.
    Run,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::List => run_list(&cfg)?,
            CliCommand::Add { urls } => run_add(&cfg, &urls)?,
            CliCommand::Run => run_run(cfg).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
