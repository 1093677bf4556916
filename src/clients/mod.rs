//! Interfaces to the world outside the grid engine.
//!
//! The engine never talks to an RPC node or HTTP API directly; it goes
//! through these traits so the chain, the price feed and the pool registry can
//! be swapped for the in-memory simulation or a test double.

pub mod coingecko;
pub mod dexscreener;

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::types::{PoolKeys, ReserveSnapshot, TransactionBundle, TxId, TxStatus, WrappedAccount};
use crate::error::TradingResult;

pub use coingecko::{CoinGeckoClient, StaticPriceFeed};
pub use dexscreener::DexScreenerClient;

/// Pool discovery. Results are stable for the life of the process.
#[async_trait]
pub trait PoolRegistry: Send + Sync {
    async fn resolve_pair_address(&self, token_address: &str) -> TradingResult<String>;

    async fn resolve_pool_keys(&self, pair_address: &str) -> TradingResult<PoolKeys>;
}

/// Current pool reserves. Must hit the chain on every call.
#[async_trait]
pub trait ReserveOracle: Send + Sync {
    async fn fetch_reserves(&self, pool: &PoolKeys) -> TradingResult<ReserveSnapshot>;
}

/// Fiat price of the quote asset (SOL)
#[async_trait]
pub trait ReferencePriceFeed: Send + Sync {
    async fn fetch_reference_price(&self) -> TradingResult<f64>;
}

/// Wallet-side token accounts and balances
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Public key of the trading wallet
    fn owner(&self) -> String;

    /// Address the token account would have if it were created now
    fn associated_token_address(&self, mint: &str) -> String;

    async fn find_token_account(&self, mint: &str) -> TradingResult<Option<String>>;

    /// Decimal-adjusted token balance
    async fn fetch_token_balance(&self, mint: &str) -> TradingResult<f64>;

    /// SOL balance in lamports
    async fn fetch_sol_balance(&self) -> TradingResult<u64>;
}

/// Transaction submission and confirmation
#[async_trait]
pub trait SwapGateway: Send + Sync {
    async fn rent_exempt_minimum(&self) -> TradingResult<u64>;

    /// Derive a fresh address for a wrapped-SOL scratch account
    async fn create_wrapped_account(&self) -> TradingResult<WrappedAccount>;

    /// Send the bundle as one atomic transaction
    async fn submit(&self, bundle: &TransactionBundle) -> TradingResult<TxId>;

    async fn signature_status(&self, tx_id: &TxId) -> TradingResult<TxStatus>;
}

/// Everything the bot needs from outside, behind shared handles
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<dyn PoolRegistry>,
    pub oracle: Arc<dyn ReserveOracle>,
    pub price_feed: Arc<dyn ReferencePriceFeed>,
    pub ledger: Arc<dyn TokenLedger>,
    pub gateway: Arc<dyn SwapGateway>,
}

impl Collaborators {
    /// Wire one chain implementation into every chain-facing slot
    pub fn from_chain<C>(chain: Arc<C>, price_feed: Arc<dyn ReferencePriceFeed>) -> Self
    where
        C: PoolRegistry + ReserveOracle + TokenLedger + SwapGateway + 'static,
    {
        Self {
            registry: chain.clone(),
            oracle: chain.clone(),
            price_feed,
            ledger: chain.clone(),
            gateway: chain,
        }
    }
}
