// Grid trading loop: poll the pool, decide, size and execute

use chrono::{DateTime, Utc};
use std::future::Future;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::clients::Collaborators;
use crate::config::Config;
use crate::core::amounts::compute_amounts;
use crate::core::decision::{decide, Decision, GridSignal};
use crate::core::executor::{ComputeBudget, ConfirmPolicy, TradeExecutor};
use crate::core::grid::{build_levels, GridLevels, GridSpec};
use crate::core::types::{Confirmation, PoolKeys, ReserveSnapshot, TradeAction, TradeIntent, TradeMemory};
use crate::error::{Recovery, TradingError, TradingResult};

/// What happened in one polling cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub price: f64,
    pub reference_price: f64,
    pub reserves: ReserveSnapshot,
    pub signal: GridSignal,
    pub decision: Decision,
    pub intent: Option<TradeIntent>,
    pub confirmation: Option<Confirmation>,
}

impl CycleReport {
    pub fn traded(&self) -> bool {
        self.confirmation.is_some()
    }
}

/// Running totals across the life of the loop
#[derive(Debug, Clone, PartialEq)]
pub struct TradingStats {
    pub cycles: u64,
    pub buys: u64,
    pub sells: u64,
    pub holds: u64,
    pub skipped_trades: u64,
    pub failed_cycles: u64,
    pub started_at: DateTime<Utc>,
}

impl TradingStats {
    fn new() -> Self {
        Self {
            cycles: 0,
            buys: 0,
            sells: 0,
            holds: 0,
            skipped_trades: 0,
            failed_cycles: 0,
            started_at: Utc::now(),
        }
    }

    pub fn trades(&self) -> u64 {
        self.buys + self.sells
    }

    fn record(&mut self, report: &CycleReport) {
        match (report.decision, &report.confirmation) {
            (Decision::Trade(TradeAction::Buy), Some(_)) => self.buys += 1,
            (Decision::Trade(TradeAction::Sell), Some(_)) => self.sells += 1,
            (Decision::Skip { .. }, _) => self.skipped_trades += 1,
            _ => self.holds += 1,
        }
    }
}

pub struct GridTrader {
    config: Config,
    levels: GridLevels,
    collaborators: Collaborators,
    pool: PoolKeys,
    mint: String,
    executor: TradeExecutor,
    memory: TradeMemory,
    stats: TradingStats,
    bootstrapped: bool,
}

impl GridTrader {
    /// Resolve the pool, make sure the token account exists and build the grid.
    ///
    /// Everything that fails here is fatal to the caller.
    pub async fn start(config: Config, collaborators: Collaborators) -> TradingResult<Self> {
        config.validate()?;
        let levels = build_levels(&config.grid)?;

        info!(
            "🎯 Grid ${:.4} - ${:.4} with {} levels (step ${:.6})",
            config.grid.price_low,
            config.grid.price_high,
            levels.len(),
            config.grid.step()
        );
        if config.logging.log_grid_levels {
            debug!(
                "Levels: {:?}",
                levels.as_slice().iter().map(|l| format!("${:.4}", l)).collect::<Vec<_>>()
            );
        }

        let token = config.trade.token_address.clone();
        let pair = collaborators
            .registry
            .resolve_pair_address(&token)
            .await
            .map_err(as_pool_resolution)?;
        let pool = collaborators
            .registry
            .resolve_pool_keys(&pair)
            .await
            .map_err(as_pool_resolution)?;
        let mint = pool.traded_mint().to_string();
        info!("🔗 Trading {} through pool {} ({})", mint, pool.amm_id, pair);

        let ledger = &collaborators.ledger;
        let existing = ledger.find_token_account(&mint).await?;
        let token_account = existing
            .clone()
            .unwrap_or_else(|| ledger.associated_token_address(&mint));

        let executor = TradeExecutor::new(
            collaborators.gateway.clone(),
            ledger.owner(),
            pool.clone(),
            token_account,
            ComputeBudget::from(&config.trade),
            ConfirmPolicy::from(&config.polling),
        );

        let bootstrapped = existing.is_none();
        if bootstrapped {
            info!("🆕 No token account for {}, creating one", mint);
            executor.initialize_token_account(&mint).await?;
        } else {
            debug!("Using token account {}", executor.token_account());
        }

        Ok(Self {
            config,
            levels,
            collaborators,
            pool,
            mint,
            executor,
            memory: TradeMemory::new(),
            stats: TradingStats::new(),
            bootstrapped,
        })
    }

    /// Carry memory over from an earlier session
    pub fn with_memory(mut self, memory: TradeMemory) -> Self {
        self.memory = memory;
        self
    }

    /// One poll: price, decision and, if actionable, a confirmed trade.
    ///
    /// The price the decision is made on is the one passed to execution.
    pub async fn run_cycle(&mut self) -> TradingResult<CycleReport> {
        let reserves = self.collaborators.oracle.fetch_reserves(&self.pool).await?;
        let reference_price = self.collaborators.price_feed.fetch_reference_price().await?;
        if !is_usable_price(reference_price) {
            return Err(TradingError::PriceFeedUnavailable(format!(
                "reference price {} is not a positive number",
                reference_price
            )));
        }
        let price = reserves
            .token_price(reference_price)
            .ok_or(TradingError::InsufficientReserves {
                base_reserve: reserves.base_reserve,
                quote_reserve: reserves.quote_reserve,
            })?;
        if !is_usable_price(price) {
            return Err(TradingError::PriceFeedUnavailable(format!(
                "derived token price {} is not a positive number",
                price
            )));
        }

        let (signal, decision) = decide(price, &self.config.grid, &self.levels, &self.memory);

        let mut report = CycleReport {
            price,
            reference_price,
            reserves,
            signal,
            decision,
            intent: None,
            confirmation: None,
        };

        match decision {
            Decision::Hold => {
                info!("💤 Price ${:.6} {}: holding", price, signal);
            }
            Decision::Skip { intended, reason } => {
                info!("⏭️  Price ${:.6} {}: {} suppressed ({})", price, signal, intended, reason);
            }
            Decision::Trade(action) => {
                let balance = match action {
                    TradeAction::Sell => self.collaborators.ledger.fetch_token_balance(&self.mint).await?,
                    TradeAction::Buy => 0.0,
                };

                let intent = compute_amounts(action, &self.config.trade, &reserves, balance)?;
                info!(
                    "{} {} signal at ${:.6} ({}): amount_in={} minimum_out={}",
                    action_icon(action),
                    action,
                    price,
                    signal,
                    intent.amount_in,
                    intent.minimum_amount_out
                );
                report.intent = Some(intent);

                let confirmation = self.executor.execute(&intent, price, &mut self.memory).await?;
                info!("💰 {} confirmed in {} at ${:.6}", action, confirmation.tx_id, price);
                report.confirmation = Some(confirmation);
            }
        }

        Ok(report)
    }

    /// Poll until `shutdown` resolves or `max_cycles` have run.
    ///
    /// A failed cycle is logged and followed by the normal sleep. A shutdown
    /// arriving mid-cycle drops the cycle, including any confirmation wait,
    /// without touching trade memory.
    pub async fn run<F>(&mut self, max_cycles: Option<u64>, shutdown: F) -> TradingResult<TradingStats>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let interval = self.config.polling.interval();
        info!("🚀 Polling every {:?}", interval);

        loop {
            if let Some(limit) = max_cycles {
                if self.stats.cycles >= limit {
                    info!("⏰ Reached {} cycles", limit);
                    break;
                }
            }

            let outcome = tokio::select! {
                result = self.run_cycle() => Some(result),
                _ = &mut shutdown => None,
            };

            let Some(outcome) = outcome else {
                warn!("🛑 Shutdown during a cycle; any pending trade outcome is unknown");
                break;
            };

            self.stats.cycles += 1;
            match outcome {
                Ok(report) => self.stats.record(&report),
                Err(e) => {
                    self.stats.failed_cycles += 1;
                    match e.recovery() {
                        Recovery::SkipCycle => match e {
                            TradingError::TradeSubmissionFailed(_) => {
                                error!("❌ Trade failed, memory unchanged: {}", e)
                            }
                            _ => warn!("⚠️  Cycle skipped [{}]: {}", e.category(), e),
                        },
                        Recovery::Fatal => {
                            error!("❌ Fatal error: {}", e);
                            return Err(e);
                        }
                    }
                }
            }

            if max_cycles.is_some_and(|limit| self.stats.cycles >= limit) {
                continue;
            }

            tokio::select! {
                _ = sleep(interval) => {}
                _ = &mut shutdown => {
                    info!("🛑 Shutdown requested");
                    break;
                }
            }
        }

        info!(
            "📊 {} cycles, {} buys, {} sells, {} suppressed, {} failed",
            self.stats.cycles,
            self.stats.buys,
            self.stats.sells,
            self.stats.skipped_trades,
            self.stats.failed_cycles
        );
        Ok(self.stats.clone())
    }

    pub fn memory(&self) -> &TradeMemory {
        &self.memory
    }

    pub fn levels(&self) -> &GridLevels {
        &self.levels
    }

    pub fn grid(&self) -> &GridSpec {
        &self.config.grid
    }

    pub fn pool(&self) -> &PoolKeys {
        &self.pool
    }

    pub fn mint(&self) -> &str {
        &self.mint
    }

    pub fn token_account(&self) -> &str {
        self.executor.token_account()
    }

    pub fn stats(&self) -> &TradingStats {
        &self.stats
    }

    /// Whether `start` had to create the token account
    pub fn bootstrapped(&self) -> bool {
        self.bootstrapped
    }
}

fn as_pool_resolution(err: TradingError) -> TradingError {
    match err {
        TradingError::PoolResolution(_) => err,
        other => TradingError::PoolResolution(other.to_string()),
    }
}

fn is_usable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

fn action_icon(action: TradeAction) -> &'static str {
    match action {
        TradeAction::Buy => "🟢",
        TradeAction::Sell => "🔴",
    }
}
