// Core grid engine modules

pub mod amounts;
pub mod decision;
pub mod executor;
pub mod grid;
pub mod grid_trader;
pub mod types;

// Re-export commonly used types
pub use amounts::{compute_amounts, constant_product_out};
pub use decision::{decide, Decision, GridSignal, SkipReason};
pub use executor::{ComputeBudget, ConfirmPolicy, TradeExecutor};
pub use grid::{build_levels, nearest_level, GridLevels, GridSpec};
pub use grid_trader::{CycleReport, GridTrader, TradingStats};
pub use types::{
    Confirmation, PoolKeys, ReserveSnapshot, TradeAction, TradeIntent, TradeMemory, TransactionBundle, TxId, TxStatus,
};
