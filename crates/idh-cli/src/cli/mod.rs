//! CLI for the IDH identity harvester.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use idh_core::config::{self, HarvestConfig, RetryConfig};
use std::path::PathBuf;

use commands::{run_harvest, run_inspect};

/// Top-level CLI for the identity harvester.
#[derive(Debug, Parser)]
#[command(name = "idh")]
#[command(about = "IDH: bulk identity fetcher with incremental spreadsheet persistence", long_about = None)]
pub struct Cli {
    /// Load this config file instead of ~/.config/idh/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log to stderr instead of ~/.local/state/idh/idh.log.
    #[arg(long, global = true)]
    pub log_stderr: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch identities and append them to the output workbook.
    Run {
        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// Show how many data rows the output workbook holds.
    Inspect {
        /// Workbook to read (default: output_path from config).
        path: Option<PathBuf>,
        /// Sheet to count (default: sheet_name from config).
        #[arg(long)]
        sheet: Option<String>,
    },
}

/// Per-run overrides of config.toml values.
#[derive(Debug, Clone, Default, Args)]
pub struct RunOverrides {
    /// Number of requests to issue.
    #[arg(long, value_name = "N")]
    pub requests: Option<u64>,
    /// Maximum requests in flight.
    #[arg(long, value_name = "K")]
    pub concurrency: Option<usize>,
    /// Retries after HTTP 429 before giving up on a request.
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,
    /// Initial backoff delay in milliseconds (doubles per retry).
    #[arg(long, value_name = "MS")]
    pub initial_delay_ms: Option<u64>,
    /// Save the workbook every N completed requests.
    #[arg(long, value_name = "N")]
    pub flush_every: Option<u64>,
    /// Output workbook path.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
    /// Country code of the identities to fetch.
    #[arg(long, value_name = "CODE")]
    pub country: Option<String>,
    /// API client id (basic-auth user).
    #[arg(long, value_name = "ID")]
    pub client_id: Option<String>,
    /// API secret (basic-auth password).
    #[arg(long, value_name = "SECRET")]
    pub secret: Option<String>,
}

impl RunOverrides {
    pub fn apply(&self, cfg: &mut HarvestConfig) {
        if let Some(n) = self.requests {
            cfg.total_requests = n;
        }
        if let Some(k) = self.concurrency {
            cfg.max_concurrency = k;
        }
        if let Some(n) = self.flush_every {
            cfg.flush_every = n;
        }
        if self.max_retries.is_some() || self.initial_delay_ms.is_some() {
            let retry = cfg.retry.get_or_insert_with(RetryConfig::default);
            if let Some(n) = self.max_retries {
                retry.max_retries = n;
            }
            if let Some(ms) = self.initial_delay_ms {
                retry.initial_delay_ms = ms;
            }
        }
        if let Some(p) = &self.output {
            cfg.output_path = p.clone();
        }
        if let Some(c) = &self.country {
            cfg.api.country_code = c.clone();
        }
        if let Some(id) = &self.client_id {
            cfg.api.client_id = id.clone();
        }
        if let Some(s) = &self.secret {
            cfg.api.secret = s.clone();
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut cfg = match &self.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };

        match self.command {
            CliCommand::Run { overrides } => {
                overrides.apply(&mut cfg);
                tracing::debug!(
                    total = cfg.total_requests,
                    concurrency = cfg.max_concurrency,
                    flush_every = cfg.flush_every,
                    output = %cfg.output_path.display(),
                    "effective config"
                );
                run_harvest(&cfg).await?
            }
            CliCommand::Inspect { path, sheet } => {
                let path = path.unwrap_or_else(|| cfg.output_path.clone());
                let sheet = sheet.unwrap_or_else(|| cfg.sheet_name.clone());
                run_inspect(&path, &sheet)?
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
