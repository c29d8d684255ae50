//! Market admin CLI entrypoint.
//!
//! This is the main entrypoint for the market-admin command-line tool.

use std::process::ExitCode;

use aave_market_admin::cli::{Cli, Commands, MarketArgs, OutputFormatter, RunArgs};
use aave_market_admin::config::{
    ConfigExporter, ConfigParser, DocumentOverrides, NormalizeMode, env_value,
    parse_address,
};
use aave_market_admin::error::{ConfigError, Result};
use aave_market_admin::market::{
    AddressResolver, ChainGateway, ChainRegistry, ChainSession, EndpointOverrides,
};
use aave_market_admin::planner::RunMode;
use aave_market_admin::reconciler::{MarketReconciler, OperationReport, RunOptions};

use alloy::primitives::Address;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const PRIVATE_KEY_ENV_KEYS: &[&str] = &["AAVE_PRIVATE_KEY", "PRIVATE_KEY"];

/// Main entrypoint.
fn main() -> ExitCode {
    // .env values feed the clap env fallbacks
    if let Err(e) = ConfigParser::default().load_dotenv() {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Everything a command needs to talk to the market.
struct Context {
    session: ChainSession,
    gateway: ChainGateway,
    formatter: OutputFormatter,
}

impl Context {
    /// Connects and resolves the five endpoints.
    async fn connect(cli: &Cli, parser: &ConfigParser, require_signer: bool) -> Result<Self> {
        let rpc_url = cli
            .rpc_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar {
                name: String::from("AAVE_RPC_URL"),
            })?;

        let private_key = env_value(PRIVATE_KEY_ENV_KEYS);
        if require_signer && private_key.is_none() {
            return Err(ConfigError::MissingEnvVar {
                name: String::from("AAVE_PRIVATE_KEY"),
            }
            .into());
        }

        let session = ChainSession::connect(rpc_url, private_key.as_deref())?;
        let record = parser.load_deployment_record(cli.deployment_file.as_deref())?;

        let overrides = EndpointOverrides::from_lookup(|key| std::env::var(key).ok())
            .or(EndpointOverrides::from_deployment(&record));
        let registry: Option<ChainRegistry> = overrides
            .registry_address()?
            .map(|address| session.registry(address));

        let endpoints = AddressResolver::new()
            .resolve(&overrides, registry.as_ref())
            .await?;
        let gateway = session.gateway(endpoints);
        debug!(endpoints = ?gateway.endpoints(), "Resolved endpoints");

        Ok(Self {
            session,
            gateway,
            formatter: OutputFormatter::new(cli.output),
        })
    }

    fn account(&self) -> Address {
        self.session.account().unwrap_or(Address::ZERO)
    }

    fn reconciler(&self) -> MarketReconciler<'_> {
        MarketReconciler::new(&self.gateway, self.account())
    }

    fn print(&self, report: OperationReport) -> Result<()> {
        println!("{}", self.formatter.format_report(&report));
        let live = report.mode == RunMode::Live;
        report.ensure_success().inspect_err(|e| {
            if live && e.is_mid_run() {
                warn!("Run stopped part-way: earlier actions may already be applied on-chain");
            }
        })
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let parser = ConfigParser::new(&cli.configs_dir);

    match &cli.command {
        Commands::List {
            asset,
            detailed,
            export,
            network,
        } => {
            let asset = asset.as_deref().map(|a| parse_address("asset", a)).transpose()?;
            let ctx = Context::connect(&cli, &parser, false).await?;
            cmd_list(&ctx, &parser, asset, *detailed, *export, network.as_deref()).await
        }
        Commands::Add(args) => cmd_market(&cli, &parser, args, NormalizeMode::Listing).await,
        Commands::Update(args) => cmd_market(&cli, &parser, args, NormalizeMode::Update).await,
        Commands::Remove { asset, run } => {
            let asset = parse_address("asset", asset)?;
            let ctx = Context::connect(&cli, &parser, true).await?;
            cmd_remove(&ctx, asset, *run).await
        }
        Commands::UpdatePriceFeed {
            asset,
            price_feed,
            run,
        } => {
            let asset = parse_address("asset", asset)?;
            let feed = parse_address("priceFeed", price_feed)?;
            let ctx = Context::connect(&cli, &parser, true).await?;
            cmd_update_price_feed(&ctx, asset, feed, *run).await
        }
    }
}

const fn run_options(args: RunArgs) -> RunOptions {
    RunOptions {
        dry_run: args.dry_run,
        confirmed: args.yes,
    }
}

/// Add or update a market from a desired-state document.
async fn cmd_market(
    cli: &Cli,
    parser: &ConfigParser,
    args: &MarketArgs,
    mode: NormalizeMode,
) -> Result<()> {
    let overrides = DocumentOverrides {
        asset: args.asset.clone(),
        price_feed: args.price_feed.clone(),
    };
    let (_, desired) = parser.load_desired(args.config.as_deref(), &overrides, mode)?;

    let ctx = Context::connect(cli, parser, true).await?;
    let options = run_options(args.run);
    let reconciler = ctx.reconciler();
    let report = match mode {
        NormalizeMode::Listing => reconciler.add_market(&desired, options).await?,
        NormalizeMode::Update => reconciler.update_market(&desired, options).await?,
    };
    ctx.print(report)
}

/// Drop a listed market.
async fn cmd_remove(ctx: &Context, asset: Address, args: RunArgs) -> Result<()> {
    let report = ctx.reconciler().remove_market(asset, run_options(args)).await?;
    ctx.print(report)
}

/// Point a market at a new oracle source.
async fn cmd_update_price_feed(
    ctx: &Context,
    asset: Address,
    feed: Address,
    args: RunArgs,
) -> Result<()> {
    let report = ctx
        .reconciler()
        .update_price_feed(asset, feed, run_options(args))
        .await?;
    ctx.print(report)
}

/// Show listed markets, optionally exporting them.
async fn cmd_list(
    ctx: &Context,
    parser: &ConfigParser,
    asset: Option<Address>,
    detailed: bool,
    export: bool,
    network: Option<&str>,
) -> Result<()> {
    let markets = ctx.reconciler().list_markets(asset).await?;
    println!("{}", ctx.formatter.format_markets(&markets, detailed));

    if !export {
        return Ok(());
    }

    let network = match network {
        Some(name) => name.to_string(),
        None => ConfigExporter::default_network(ctx.session.chain_id().await?),
    };
    let exporter = ConfigExporter::new(parser.configs_dir(), &network);

    let mut paths = Vec::with_capacity(markets.len());
    for market in &markets {
        paths.push(exporter.export(&market.snapshot, &market.metadata).await?);
    }
    println!("{}", ctx.formatter.format_exports(&paths));
    Ok(())
}
