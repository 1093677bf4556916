// AMM Grid Trading Bot Library
//
// Grid trading for one token/SOL constant-product pool: fixed price levels,
// repeat-trade suppression, slippage-bounded swaps and a self-healing polling loop

pub mod clients;
pub mod config;
pub mod core;
pub mod error;      // Unified error handling
pub mod simulation; // In-memory pool for paper trading
pub mod validation; // Pre-flight validation

// Re-export core trading types
pub use core::{
    build_levels, compute_amounts, decide, nearest_level, Confirmation, CycleReport, Decision, GridLevels,
    GridSignal, GridSpec, GridTrader, ReserveSnapshot, SkipReason, TradeAction, TradeExecutor, TradeIntent,
    TradeMemory, TradingStats,
};

// Re-export error types
pub use error::{Recovery, TradingError, TradingResult};

// Re-export validation types
pub use validation::{PreFlightValidator, ValidationCheck, ValidationLevel, ValidationResult};

// Re-export client types
pub use clients::{
    CoinGeckoClient, Collaborators, DexScreenerClient, PoolRegistry, ReferencePriceFeed, ReserveOracle,
    StaticPriceFeed, SwapGateway, TokenLedger,
};

// Re-export configuration
pub use config::{Config, ConfigError, FeedsConfig, LoggingConfig, PollingConfig, SimulationConfig, TradeConfig};

// Re-export the simulated chain
pub use simulation::{ConfirmationMode, SimulatedChain};
