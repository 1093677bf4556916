//! Error handling for the AMM grid bot
//!
//! Every failure the engine can hit maps onto one `TradingError` variant, and
//! each variant carries a `Recovery` policy: startup problems are fatal, while
//! anything that goes wrong inside a polling cycle only skips that cycle.

use std::io;
use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for the grid bot
#[derive(Debug, Error)]
pub enum TradingError {
    // Grid / configuration errors
    #[error("Invalid grid: {0}")]
    InvalidGridSpec(String),

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Configuration validation error: {0}")]
    ConfigValidation(String),

    // Market data errors
    #[error("Insufficient reserves: base={base_reserve}, quote={quote_reserve}")]
    InsufficientReserves { base_reserve: f64, quote_reserve: f64 },

    #[error("Price feed unavailable: {0}")]
    PriceFeedUnavailable(String),

    #[error("Pool resolution failed: {0}")]
    PoolResolution(String),

    // Trading errors
    #[error("Trade submission failed: {0}")]
    TradeSubmissionFailed(String),

    #[error("Nothing to sell: token balance is {0}")]
    NothingToSell(f64),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// What the polling loop does after an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Abort the process; only raised at startup.
    Fatal,
    /// Log, sleep the normal interval and try again with a fresh decision.
    SkipCycle,
}

impl TradingError {
    /// Get a user-friendly error message with helpful context
    pub fn user_message(&self) -> String {
        match self {
            TradingError::ConfigNotFound(path) => {
                format!(
                    "Configuration file not found: {}\n\n\
                    💡 Quick fix:\n\
                    1. Run: grid-bot init\n\
                    2. Edit config.toml with your grid bounds and token\n\
                    3. Try again",
                    path
                )
            }
            TradingError::InvalidGridSpec(msg) => {
                format!(
                    "Invalid grid: {}\n\n\
                    💡 Check [grid] in config.toml:\n\
                    - price_high must be greater than price_low\n\
                    - level_count must be at least 1",
                    msg
                )
            }
            TradingError::InsufficientReserves { base_reserve, quote_reserve } => {
                format!(
                    "Pool reserves are degenerate (base {}, quote {})\n\n\
                    💡 The pool may be drained or not yet initialised; the bot retries next cycle",
                    base_reserve, quote_reserve
                )
            }
            TradingError::PoolResolution(msg) => {
                format!(
                    "Could not resolve the trading pool: {}\n\n\
                    💡 Check:\n\
                    - [trade] token_address is the mint of the traded token\n\
                    - the token has a Raydium pool paired with SOL",
                    msg
                )
            }
            _ => self.to_string(),
        }
    }

    /// How the polling loop should react to this error
    pub fn recovery(&self) -> Recovery {
        match self {
            TradingError::InvalidGridSpec(_)
            | TradingError::ConfigNotFound(_)
            | TradingError::ConfigParse(_)
            | TradingError::ConfigValidation(_)
            | TradingError::PoolResolution(_) => Recovery::Fatal,

            TradingError::InsufficientReserves { .. }
            | TradingError::PriceFeedUnavailable(_)
            | TradingError::TradeSubmissionFailed(_)
            | TradingError::NothingToSell(_)
            | TradingError::Internal(_) => Recovery::SkipCycle,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        self.recovery() == Recovery::SkipCycle
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            TradingError::InvalidGridSpec(_)
            | TradingError::ConfigNotFound(_)
            | TradingError::ConfigParse(_)
            | TradingError::ConfigValidation(_) => "config",

            TradingError::InsufficientReserves { .. }
            | TradingError::PriceFeedUnavailable(_)
            | TradingError::PoolResolution(_) => "market",

            TradingError::TradeSubmissionFailed(_) | TradingError::NothingToSell(_) => "trading",

            TradingError::Internal(_) => "internal",
        }
    }
}

// Conversion implementations for common error types

impl From<io::Error> for TradingError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => TradingError::ConfigNotFound(err.to_string()),
            _ => TradingError::Internal(format!("IO error: {}", err)),
        }
    }
}

impl From<toml::de::Error> for TradingError {
    fn from(err: toml::de::Error) -> Self {
        TradingError::ConfigParse(format!("TOML parse error: {}", err))
    }
}

impl From<serde_json::Error> for TradingError {
    fn from(err: serde_json::Error) -> Self {
        TradingError::PriceFeedUnavailable(format!("JSON parse error: {}", err))
    }
}

impl From<reqwest::Error> for TradingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TradingError::PriceFeedUnavailable(format!("request timed out: {}", err))
        } else if err.is_status() {
            TradingError::PriceFeedUnavailable(format!("bad response: {}", err))
        } else {
            TradingError::PriceFeedUnavailable(err.to_string())
        }
    }
}

impl From<ConfigError> for TradingError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::FileNotFound(path) => TradingError::ConfigNotFound(path),
            ConfigError::Parse(msg) => TradingError::ConfigParse(msg),
            ConfigError::Validation(msg) => TradingError::ConfigValidation(msg),
            ConfigError::Grid(msg) => TradingError::InvalidGridSpec(msg),
            other => TradingError::Internal(other.to_string()),
        }
    }
}

impl From<String> for TradingError {
    fn from(msg: String) -> Self {
        TradingError::Internal(msg)
    }
}

impl From<&str> for TradingError {
    fn from(msg: &str) -> Self {
        TradingError::Internal(msg.to_string())
    }
}

/// Result type alias using TradingError
pub type TradingResult<T> = Result<T, TradingError>;
