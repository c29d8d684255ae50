//! CLI command definitions.
//!
//! Every option has an `AAVE_*` environment fallback so runs can be driven
//! entirely from a `.env` file.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIGS_DIR;

/// Market admin - Declarative Aave V3 market reconciliation.
#[derive(Parser, Debug)]
#[command(name = "market-admin")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON-RPC endpoint of the target chain.
    #[arg(long, global = true, env = "AAVE_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Deployment record holding endpoint addresses.
    #[arg(long, global = true, env = "AAVE_DEPLOYMENT_FILE")]
    pub deployment_file: Option<PathBuf>,

    /// Directory holding desired-state documents.
    #[arg(long, global = true, env = "AAVE_CONFIGS_DIR", default_value = DEFAULT_CONFIGS_DIR)]
    pub configs_dir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show listed markets.
    List {
        /// Only show this asset.
        #[arg(long, env = "AAVE_ASSET")]
        asset: Option<String>,

        /// Show a detailed block per market.
        #[arg(short, long)]
        detailed: bool,

        /// Write one desired-state document per market.
        #[arg(long)]
        export: bool,

        /// Network directory name for exports (defaults to `chain-<id>`).
        #[arg(long, env = "AAVE_NETWORK")]
        network: Option<String>,
    },

    /// List a new market from a desired-state document.
    #[command(name = "add-market")]
    Add(MarketArgs),

    /// Reconcile a listed market with a desired-state document.
    #[command(name = "update-market")]
    Update(MarketArgs),

    /// Drop a listed market.
    #[command(name = "remove-market")]
    Remove {
        /// Asset of the market.
        #[arg(long, env = "AAVE_ASSET")]
        asset: String,

        /// Run controls.
        #[command(flatten)]
        run: RunArgs,
    },

    /// Point a market at a new oracle source.
    #[command(name = "update-price-feed")]
    UpdatePriceFeed {
        /// Asset of the market.
        #[arg(long, env = "AAVE_ASSET")]
        asset: String,

        /// New price feed.
        #[arg(long, env = "AAVE_PRICE_FEED")]
        price_feed: String,

        /// Run controls.
        #[command(flatten)]
        run: RunArgs,
    },
}

/// Arguments of the document-driven commands.
#[derive(Args, Debug)]
pub struct MarketArgs {
    /// Desired-state document, relative to the configuration directory.
    #[arg(short, long, env = "AAVE_CONFIG")]
    pub config: Option<String>,

    /// Overrides the document's asset.
    #[arg(long, env = "AAVE_ASSET")]
    pub asset: Option<String>,

    /// Overrides the document's price feed.
    #[arg(long, env = "AAVE_PRICE_FEED")]
    pub price_feed: Option<String>,

    /// Run controls.
    #[command(flatten)]
    pub run: RunArgs,
}

/// Dry-run and confirmation switches.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct RunArgs {
    /// Simulate every action without sending.
    #[arg(long, env = "AAVE_DRY_RUN")]
    pub dry_run: bool,

    /// Confirm state-changing execution.
    #[arg(short, long, env = "AAVE_YES")]
    pub yes: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
