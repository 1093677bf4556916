// AMM Grid Bot - CLI
// Single entry point for configuring, checking and running the grid

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, warn, Level};

use amm_grid_bot::clients::dexscreener::select_raydium_pair;
use amm_grid_bot::core::types::LAMPORTS_PER_SOL;
use amm_grid_bot::{
    build_levels, CoinGeckoClient, Collaborators, Config, ConfigError, DexScreenerClient, GridTrader,
    PreFlightValidator, ReferencePriceFeed, SimulatedChain, StaticPriceFeed, TradingError,
};

#[derive(Parser)]
#[command(name = "grid-bot")]
#[command(version = "0.2.0")]
#[command(about = "Grid trading on a constant-product AMM pool", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the grid levels for the configured bounds
    Levels,

    /// Run pre-flight checks against the pool and wallet
    Check {
        /// Use the live SOL price instead of the configured one
        #[arg(long)]
        live_price: bool,
    },

    /// Paper-trade the grid on the simulated pool
    Run {
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,

        /// Use the live SOL price instead of the configured one
        #[arg(long)]
        live_price: bool,
    },

    /// List the DEX pairs for a token
    Lookup {
        /// Token mint; defaults to [trade] token_address
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Config is read before logging so [logging] level can apply
    let loaded = Config::from_file(&cli.config);

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        loaded
            .as_ref()
            .ok()
            .and_then(|config| config.logging.level.parse::<Level>().ok())
            .unwrap_or(Level::INFO)
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("🚀 AMM Grid Bot v0.2.0");
    info!("📁 Config: {}", cli.config);

    match cli.command {
        // Init doesn't require config (it creates it)
        Commands::Init { force } => init_config(&cli.config, force)?,

        Commands::Levels => print_levels(&load_config_or_exit(loaded))?,

        Commands::Check { live_price } => {
            let config = load_config_or_exit(loaded);
            run_checks(&config, live_price).await;
        }

        Commands::Run { cycles, live_price } => {
            let config = load_config_or_exit(loaded);
            run_paper_trading(config, cycles, live_price).await;
        }

        Commands::Lookup { token } => {
            let config = loaded.unwrap_or_default();
            let token = token.unwrap_or_else(|| config.trade.token_address.clone());
            lookup_pairs(&config, &token).await?;
        }
    }

    Ok(())
}

/// Load config or exit with helpful error message
fn load_config_or_exit(loaded: Result<Config, ConfigError>) -> Config {
    match loaded {
        Ok(config) => config,
        Err(e) => {
            let err = TradingError::from(e);
            error!("❌ Configuration Error");
            for line in err.user_message().lines() {
                error!("{}", line);
            }
            std::process::exit(1);
        }
    }
}

fn init_config(path: &str, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if std::path::Path::new(path).exists() && !force {
        warn!("⚠️  {} already exists, skipping (use --force to overwrite)", path);
        return Ok(());
    }

    let default_config = include_str!("../../config.toml.example");
    std::fs::write(path, default_config)?;
    info!("📝 Created {}", path);
    info!("💡 Next steps:");
    info!("   1. Set [trade] token_address and the [grid] bounds");
    info!("   2. Run: grid-bot check");
    info!("   3. Run: grid-bot run --cycles 10");

    Ok(())
}

fn print_levels(config: &Config) -> Result<(), TradingError> {
    let levels = build_levels(&config.grid)?;

    info!(
        "🎯 {} levels from ${:.4} to ${:.4}, step ${:.6}",
        levels.len(),
        levels.lowest(),
        levels.highest(),
        config.grid.step()
    );
    for (i, level) in levels.as_slice().iter().enumerate() {
        println!("{:>5}  {:.6}", i, level);
    }

    Ok(())
}

fn price_feed(config: &Config, live_price: bool) -> Arc<dyn ReferencePriceFeed> {
    if live_price {
        info!("📡 Reference price from {}", config.feeds.reference_price_url);
        Arc::new(CoinGeckoClient::from_config(&config.feeds))
    } else {
        Arc::new(StaticPriceFeed(config.simulation.reference_price))
    }
}

async fn run_checks(config: &Config, live_price: bool) {
    let chain = Arc::new(SimulatedChain::from_config(config));
    let collaborators = Collaborators::from_chain(chain, price_feed(config, live_price));

    let result = PreFlightValidator::new(config, &collaborators).validate_all().await;
    result.display();

    if !result.passed {
        std::process::exit(1);
    }
}

async fn run_paper_trading(config: Config, cycles: Option<u64>, live_price: bool) {
    let chain = Arc::new(SimulatedChain::from_config(&config));
    let collaborators = Collaborators::from_chain(chain.clone(), price_feed(&config, live_price));

    let mut trader = match GridTrader::start(config, collaborators).await {
        Ok(trader) => trader,
        Err(e) => {
            error!("❌ Startup failed [{}]", e.category());
            for line in e.user_message().lines() {
                error!("{}", line);
            }
            std::process::exit(1);
        }
    };

    info!("🎯 Paper trading - Press Ctrl+C to stop");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("🛑 Received shutdown signal");
    };

    match trader.run(cycles, shutdown).await {
        Ok(stats) => {
            info!(
                "✅ Session finished: {} cycles, {} trades since {}",
                stats.cycles,
                stats.trades(),
                stats.started_at.format("%H:%M:%S UTC")
            );
        }
        Err(e) => {
            error!("❌ {}", e.user_message());
            std::process::exit(1);
        }
    }

    let memory = trader.memory();
    info!(
        "💰 Wallet: {:.4} SOL, {:.4} tokens | last trade: {:?} at {:?}",
        chain.sol_balance() as f64 / LAMPORTS_PER_SOL,
        chain.token_balance(),
        memory.last_trade_action(),
        memory.last_trade_price()
    );
}

async fn lookup_pairs(config: &Config, token: &str) -> Result<(), TradingError> {
    let client = DexScreenerClient::from_config(&config.feeds);
    let pairs = client.fetch_pairs(token).await?;

    if pairs.is_empty() {
        warn!("⚠️  No pairs listed for {}", token);
        return Ok(());
    }

    info!("🔍 {} pair(s) for {}", pairs.len(), token);
    for pair in &pairs {
        println!(
            "{:<10} {:<46} {}/{}",
            pair.dex_id, pair.pair_address, pair.base_token.symbol, pair.quote_token.symbol
        );
    }

    match select_raydium_pair(&pairs) {
        Some(pair) => info!("✅ Bot would trade through {}", pair.pair_address),
        None => warn!("⚠️  No Raydium pair; the bot cannot trade {}", token),
    }

    Ok(())
}
