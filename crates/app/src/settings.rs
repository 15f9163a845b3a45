//! Settings for the CLI: an optional TOML file, then `SHARESPLIT_*`
//! environment variables, then command-line flags.
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use engine::{Currency, SettlementStrategy};
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/sharesplit.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Remote API base URL used when no `--input` file is given.
    pub base_url: Option<String>,
    /// Log level for `sharesplit` and `engine`.
    pub level: String,
    /// Default settlement strategy (`simplified`, `direct`, `auto`).
    pub strategy: SettlementStrategy,
    /// Currency for group records that carry none.
    pub currency: Currency,
    /// Print JSON instead of text.
    pub json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: None,
            level: "info".to_string(),
            strategy: SettlementStrategy::Auto,
            currency: Currency::Eur,
            json: false,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "sharesplit")]
#[command(about = "Split shared expenses, show balances and settle up")]
pub struct Cli {
    /// Optional config file path (TOML).
    #[arg(long)]
    pub config: Option<String>,
    /// Group snapshot file (`{"group": ..., "expenses": [...]}`); takes
    /// precedence over the API.
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// Override base URL of the expenses API.
    #[arg(long, env = "SHARESPLIT_BASE_URL")]
    pub base_url: Option<String>,
    /// Group id to fetch from the API.
    #[arg(long)]
    pub group: Option<String>,
    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
    /// Override log level (e.g. `debug`).
    #[arg(long)]
    pub level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show how one expense is split.
    Split {
        #[arg(long)]
        expense: String,
    },
    /// Show net balances per member.
    Balances {
        /// Include members that are settled up.
        #[arg(long)]
        all: bool,
    },
    /// Suggest the transfers that settle the group.
    Settle {
        #[arg(long)]
        strategy: Option<String>,
        /// Mark every expense as settled instead of planning transfers.
        #[arg(long)]
        mark_settled: bool,
    },
    /// Check every expense and report the ones that cannot be split.
    Check,
}

pub fn load() -> Result<(Cli, Settings)> {
    let cli = Cli::parse();

    let config_path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("SHARESPLIT"));
    let mut settings: Settings = builder.build()?.try_deserialize()?;

    if let Some(base_url) = &cli.base_url {
        settings.base_url = Some(base_url.clone());
    }
    if let Some(level) = &cli.level {
        settings.level = level.clone();
    }
    if let Command::Settle {
        strategy: Some(strategy),
        ..
    } = &cli.command
    {
        settings.strategy = SettlementStrategy::try_from(strategy.as_str())?;
    }
    if cli.json {
        settings.json = true;
    }

    Ok((cli, settings))
}
