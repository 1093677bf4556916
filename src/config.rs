// Configuration management for the grid bot

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::grid::GridSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeConfig {
    /// Mint of the traded token
    #[serde(default = "default_token_address")]
    pub token_address: String,
    /// SOL spent per buy
    #[serde(default = "default_sol_amount")]
    pub sol_amount: f64,
    #[serde(default = "default_slippage_percent")]
    pub slippage_percent: f64,
    /// Share of the token balance sold per sell
    #[serde(default = "default_sell_percentage")]
    pub sell_percentage: f64,
    #[serde(default = "default_compute_unit_limit")]
    pub compute_unit_limit: u32,
    /// Micro-lamports per compute unit
    #[serde(default = "default_compute_unit_price")]
    pub compute_unit_price: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default = "default_confirm_attempts")]
    pub confirm_attempts: u32,
    #[serde(default = "default_confirm_delay_ms")]
    pub confirm_delay_ms: u64,
    /// Hard ceiling on one confirmation wait
    #[serde(default = "default_confirm_timeout_seconds")]
    pub confirm_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    #[serde(default = "default_reference_price_url")]
    pub reference_price_url: String,
    #[serde(default = "default_reference_asset")]
    pub reference_asset: String,
    #[serde(default = "default_fiat_currency")]
    pub fiat_currency: String,
    #[serde(default = "default_pair_lookup_url")]
    pub pair_lookup_url: String,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub log_grid_levels: bool,
}

/// Paper-trading pool used by `grid-bot run`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_base_reserve")]
    pub base_reserve: f64,
    #[serde(default = "default_quote_reserve")]
    pub quote_reserve: f64,
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u8,
    /// SOL price in fiat when no live feed is used
    #[serde(default = "default_reference_price")]
    pub reference_price: f64,
    /// Std-dev of the random external flow applied per poll, as a share of reserves
    #[serde(default = "default_volatility")]
    pub volatility: f64,
    #[serde(default = "default_initial_sol")]
    pub initial_sol: f64,
    #[serde(default)]
    pub initial_tokens: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub grid: GridSpec,
    #[serde(default)]
    pub trade: TradeConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

// Default value functions
fn default_token_address() -> String { "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr".to_string() }
fn default_sol_amount() -> f64 { 0.01 }
fn default_slippage_percent() -> f64 { 1.0 }
fn default_sell_percentage() -> f64 { 100.0 }
fn default_compute_unit_limit() -> u32 { 100_000 }
fn default_compute_unit_price() -> u64 { 1_000_000 }
fn default_interval_seconds() -> u64 { 60 }
fn default_confirm_attempts() -> u32 { 20 }
fn default_confirm_delay_ms() -> u64 { 3_000 }
fn default_confirm_timeout_seconds() -> u64 { 90 }
fn default_reference_price_url() -> String { "https://api.coingecko.com/api/v3".to_string() }
fn default_reference_asset() -> String { "solana".to_string() }
fn default_fiat_currency() -> String { "usd".to_string() }
fn default_pair_lookup_url() -> String { "https://api.dexscreener.com".to_string() }
fn default_request_timeout_seconds() -> u64 { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_base_reserve() -> f64 { 1_000_000.0 }
fn default_quote_reserve() -> f64 { 5_000.0 }
fn default_token_decimals() -> u8 { 6 }
fn default_reference_price() -> f64 { 150.0 }
fn default_volatility() -> f64 { 0.01 }
fn default_initial_sol() -> f64 { 1.0 }

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            token_address: default_token_address(),
            sol_amount: default_sol_amount(),
            slippage_percent: default_slippage_percent(),
            sell_percentage: default_sell_percentage(),
            compute_unit_limit: default_compute_unit_limit(),
            compute_unit_price: default_compute_unit_price(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            confirm_attempts: default_confirm_attempts(),
            confirm_delay_ms: default_confirm_delay_ms(),
            confirm_timeout_seconds: default_confirm_timeout_seconds(),
        }
    }
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            reference_price_url: default_reference_price_url(),
            reference_asset: default_reference_asset(),
            fiat_currency: default_fiat_currency(),
            pair_lookup_url: default_pair_lookup_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_grid_levels: false,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_reserve: default_base_reserve(),
            quote_reserve: default_quote_reserve(),
            token_decimals: default_token_decimals(),
            reference_price: default_reference_price(),
            volatility: default_volatility(),
            initial_sol: default_initial_sol(),
            initial_tokens: 0.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridSpec::new(0.7, 0.8, 100),
            trade: TradeConfig::default(),
            polling: PollingConfig::default(),
            feeds: FeedsConfig::default(),
            logging: LoggingConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// Load configuration from file, or create default if file doesn't exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.to_file(&path)?;
            tracing::info!("📁 Created default config file: {}", path.as_ref().display());
            Ok(config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.check().map_err(ConfigError::Grid)?;

        if self.trade.token_address.trim().is_empty() {
            return Err(ConfigError::Validation("token_address must be set".to_string()));
        }

        if self.trade.sol_amount <= 0.0 || !self.trade.sol_amount.is_finite() {
            return Err(ConfigError::Validation("sol_amount must be positive".to_string()));
        }

        if !(0.0..=100.0).contains(&self.trade.slippage_percent) {
            return Err(ConfigError::Validation("slippage_percent must be between 0 and 100".to_string()));
        }

        if !(self.trade.sell_percentage > 0.0 && self.trade.sell_percentage <= 100.0) {
            return Err(ConfigError::Validation("sell_percentage must be in (0, 100]".to_string()));
        }

        if self.polling.interval_seconds == 0 {
            return Err(ConfigError::Validation("interval_seconds must be greater than 0".to_string()));
        }

        if self.polling.confirm_attempts == 0 {
            return Err(ConfigError::Validation("confirm_attempts must be greater than 0".to_string()));
        }

        if self.polling.confirm_timeout_seconds == 0 {
            return Err(ConfigError::Validation("confirm_timeout_seconds must be greater than 0".to_string()));
        }

        if !(0.0..1.0).contains(&self.simulation.volatility) {
            return Err(ConfigError::Validation("simulation volatility must be in [0, 1)".to_string()));
        }

        if !(self.simulation.reference_price.is_finite() && self.simulation.reference_price > 0.0) {
            return Err(ConfigError::Validation("simulation reference_price must be positive".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    FileRead(String),

    #[error("Failed to write config file: {0}")]
    FileWrite(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Invalid grid: {0}")]
    Grid(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
