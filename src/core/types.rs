// Core types shared by the decision, sizing and execution steps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lamports in one SOL
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Wrapped SOL mint
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Raydium AMM v4 program (mainnet)
pub const RAYDIUM_AMM_V4: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

/// Raydium AMM v4 authority
pub const RAYDIUM_AUTHORITY_V4: &str = "5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1";

/// SPL token program
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Size of an SPL token account, used for rent exemption
pub const TOKEN_ACCOUNT_SIZE: usize = 165;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

/// Memory of the last confirmed trade.
///
/// Only the executor writes it, and only after a confirmation; the decision
/// step reads it through a shared reference at the start of the next cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TradeMemory {
    last_trade_price: Option<f64>,
    last_trade_action: Option<TradeAction>,
}

impl TradeMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory seeded with a previously confirmed trade
    pub fn with_last_trade(price: f64, action: TradeAction) -> Self {
        Self {
            last_trade_price: Some(price),
            last_trade_action: Some(action),
        }
    }

    pub fn last_trade_price(&self) -> Option<f64> {
        self.last_trade_price
    }

    pub fn last_trade_action(&self) -> Option<TradeAction> {
        self.last_trade_action
    }

    pub fn is_empty(&self) -> bool {
        self.last_trade_price.is_none() && self.last_trade_action.is_none()
    }

    pub(crate) fn record(&mut self, price: f64, action: TradeAction) {
        self.last_trade_price = Some(price);
        self.last_trade_action = Some(action);
    }
}

/// Pool reserves, decimal-adjusted. `base` is the traded token, `quote` is SOL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReserveSnapshot {
    pub base_reserve: f64,
    pub quote_reserve: f64,
    pub token_decimals: u8,
}

impl ReserveSnapshot {
    pub fn is_degenerate(&self) -> bool {
        !(self.base_reserve.is_finite() && self.quote_reserve.is_finite())
            || self.base_reserve <= 0.0
            || self.quote_reserve <= 0.0
    }

    /// Token price in fiat, given SOL's fiat price
    pub fn token_price(&self, reference_price: f64) -> Option<f64> {
        if self.is_degenerate() {
            return None;
        }
        Some(self.quote_reserve * reference_price / self.base_reserve)
    }
}

/// Concrete swap amounts for one decision.
///
/// `amount_in` is lamports for a buy and whole tokens for a sell.
/// `minimum_amount_out` is always in the output mint's base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub action: TradeAction,
    pub amount_in: u64,
    pub minimum_amount_out: u64,
}

impl TradeIntent {
    /// The zero-amount swap used to bring the token account into existence
    pub fn initialize() -> Self {
        Self {
            action: TradeAction::Buy,
            amount_in: 0,
            minimum_amount_out: 0,
        }
    }
}

/// Routing keys for one AMM pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolKeys {
    pub amm_id: String,
    pub program_id: String,
    pub authority: String,
    pub base_mint: String,
    pub quote_mint: String,
    pub base_vault: String,
    pub quote_vault: String,
    pub open_orders: String,
    pub market_id: String,
    pub base_decimals: u8,
    pub quote_decimals: u8,
}

impl PoolKeys {
    /// The non-SOL side of the pool
    pub fn traded_mint(&self) -> &str {
        if self.base_mint != WSOL_MINT {
            &self.base_mint
        } else {
            &self.quote_mint
        }
    }
}

/// A freshly derived account that holds wrapped SOL for one swap
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedAccount {
    pub address: String,
    pub seed: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    SetComputeUnitLimit(u32),
    SetComputeUnitPrice(u64),
    CreateAssociatedTokenAccount {
        owner: String,
        mint: String,
        address: String,
    },
    CreateAccountWithSeed {
        base: String,
        seed: String,
        address: String,
        lamports: u64,
        space: usize,
        program_id: String,
    },
    InitializeAccount {
        account: String,
        mint: String,
        owner: String,
    },
    Swap {
        amm_id: String,
        amount_in: u64,
        minimum_amount_out: u64,
        source: String,
        destination: String,
        owner: String,
    },
    CloseAccount {
        account: String,
        destination: String,
        owner: String,
    },
}

/// Instructions that land together or not at all
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBundle {
    pub payer: String,
    pub instructions: Vec<Instruction>,
}

impl TransactionBundle {
    /// The swap instruction carried by this bundle, if any
    pub fn swap(&self) -> Option<&Instruction> {
        self.instructions
            .iter()
            .find(|ix| matches!(ix, Instruction::Swap { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxId(pub String);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed(String),
}

/// Proof that a swap landed
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub tx_id: TxId,
    pub intent: TradeIntent,
    pub price: f64,
    pub attempts: u32,
    pub confirmed_at: DateTime<Utc>,
}
