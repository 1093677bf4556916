//! Pre-flight validation for the grid bot
//!
//! Runs the configuration and every collaborator once before the polling loop
//! starts, so a wrong mint, a drained pool or an empty wallet shows up as a
//! readable report instead of a stream of skipped cycles.

use tracing::{error, info, warn};

use crate::clients::Collaborators;
use crate::config::Config;
use crate::core::grid::build_levels;
use crate::core::types::{PoolKeys, LAMPORTS_PER_SOL};

/// Validation result with detailed findings
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub passed: bool,
    pub checks: Vec<ValidationCheck>,
}

#[derive(Debug, Clone)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub level: ValidationLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Critical, // Must pass for the bot to start
    Warning,  // Should pass, but the bot can run
    Info,     // Informational only
}

impl ValidationCheck {
    fn ok(name: &str, message: impl Into<String>, level: ValidationLevel) -> Self {
        Self { name: name.to_string(), passed: true, message: message.into(), level }
    }

    fn failed(name: &str, message: impl Into<String>, level: ValidationLevel) -> Self {
        Self { name: name.to_string(), passed: false, message: message.into(), level }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        ValidationResult {
            passed: true,
            checks: Vec::new(),
        }
    }

    pub fn add_check(&mut self, check: ValidationCheck) {
        if !check.passed && check.level == ValidationLevel::Critical {
            self.passed = false;
        }
        self.checks.push(check);
    }

    pub fn check(&self, name: &str) -> Option<&ValidationCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn critical_failures(&self) -> Vec<&ValidationCheck> {
        self.checks
            .iter()
            .filter(|c| !c.passed && c.level == ValidationLevel::Critical)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationCheck> {
        self.checks
            .iter()
            .filter(|c| !c.passed && c.level == ValidationLevel::Warning)
            .collect()
    }

    pub fn display(&self) {
        info!("🔍 Pre-flight Validation");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        for check in &self.checks {
            let icon = if check.passed {
                "✅"
            } else {
                match check.level {
                    ValidationLevel::Critical => "❌",
                    ValidationLevel::Warning => "⚠️",
                    ValidationLevel::Info => "ℹ️",
                }
            };

            info!("{} {} - {}", icon, check.name, check.message);
        }

        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if !self.passed {
            let failures = self.critical_failures();
            error!("❌ Validation failed: {} critical issue(s)", failures.len());
            for failure in failures {
                error!("   • {}: {}", failure.name, failure.message);
            }
        } else {
            let warnings = self.warnings();
            if !warnings.is_empty() {
                warn!("⚠️  {} warning(s) detected", warnings.len());
                for warning in warnings {
                    warn!("   • {}: {}", warning.name, warning.message);
                }
            }
            info!("✅ All critical checks passed");
        }
    }
}

/// Pre-flight validator for one configuration against live collaborators
pub struct PreFlightValidator<'a> {
    config: &'a Config,
    collaborators: &'a Collaborators,
}

impl<'a> PreFlightValidator<'a> {
    pub fn new(config: &'a Config, collaborators: &'a Collaborators) -> Self {
        PreFlightValidator { config, collaborators }
    }

    /// Run the full suite; later checks are skipped when the pool cannot be found
    pub async fn validate_all(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.add_check(self.check_grid());
        result.add_check(self.check_slippage());
        result.add_check(self.check_sell_percentage());

        let pool = match self.resolve_pool().await {
            Ok(pool) => {
                result.add_check(ValidationCheck::ok(
                    "Pool",
                    format!("{} ({} decimals)", pool.amm_id, pool.base_decimals),
                    ValidationLevel::Critical,
                ));
                pool
            }
            Err(message) => {
                result.add_check(ValidationCheck::failed("Pool", message, ValidationLevel::Critical));
                return result;
            }
        };

        for check in self.check_market(&pool).await {
            result.add_check(check);
        }
        result.add_check(self.check_wallet().await);
        result.add_check(self.check_token_account(pool.traded_mint()).await);

        result
    }

    fn check_grid(&self) -> ValidationCheck {
        let grid = &self.config.grid;
        match build_levels(grid) {
            Ok(levels) if grid.level_count > 1_000 => ValidationCheck::failed(
                "Grid",
                format!("{} levels with step ${:.8}; most polls will flip between levels", levels.len(), grid.step()),
                ValidationLevel::Warning,
            ),
            Ok(levels) => ValidationCheck::ok(
                "Grid",
                format!(
                    "${:.4} - ${:.4}, {} levels, step ${:.6}",
                    grid.price_low,
                    grid.price_high,
                    levels.len(),
                    grid.step()
                ),
                ValidationLevel::Critical,
            ),
            Err(e) => ValidationCheck::failed("Grid", e.to_string(), ValidationLevel::Critical),
        }
    }

    fn check_slippage(&self) -> ValidationCheck {
        let slippage = self.config.trade.slippage_percent;
        if !(0.0..=100.0).contains(&slippage) {
            ValidationCheck::failed("Slippage", format!("{}% is outside 0-100", slippage), ValidationLevel::Critical)
        } else if slippage < 0.5 {
            ValidationCheck::failed(
                "Slippage",
                format!("{}% is below the pool fee; swaps will likely fail on chain", slippage),
                ValidationLevel::Warning,
            )
        } else if slippage > 10.0 {
            ValidationCheck::failed(
                "Slippage",
                format!("{}% tolerance invites sandwiching", slippage),
                ValidationLevel::Warning,
            )
        } else {
            ValidationCheck::ok("Slippage", format!("{}%", slippage), ValidationLevel::Info)
        }
    }

    fn check_sell_percentage(&self) -> ValidationCheck {
        let pct = self.config.trade.sell_percentage;
        if !(pct > 0.0 && pct <= 100.0) {
            ValidationCheck::failed("Sell Size", format!("{}% is outside (0, 100]", pct), ValidationLevel::Critical)
        } else {
            ValidationCheck::ok("Sell Size", format!("{}% of balance per sell", pct), ValidationLevel::Info)
        }
    }

    async fn resolve_pool(&self) -> Result<PoolKeys, String> {
        let registry = &self.collaborators.registry;
        let pair = registry
            .resolve_pair_address(&self.config.trade.token_address)
            .await
            .map_err(|e| e.to_string())?;
        registry.resolve_pool_keys(&pair).await.map_err(|e| e.to_string())
    }

    async fn check_market(&self, pool: &PoolKeys) -> Vec<ValidationCheck> {
        let reserves = match self.collaborators.oracle.fetch_reserves(pool).await {
            Ok(reserves) if !reserves.is_degenerate() => reserves,
            Ok(reserves) => {
                return vec![ValidationCheck::failed(
                    "Reserves",
                    format!("degenerate: base {}, quote {}", reserves.base_reserve, reserves.quote_reserve),
                    ValidationLevel::Critical,
                )]
            }
            Err(e) => return vec![ValidationCheck::failed("Reserves", e.to_string(), ValidationLevel::Critical)],
        };

        let mut checks = vec![ValidationCheck::ok(
            "Reserves",
            format!("{:.2} tokens / {:.4} SOL", reserves.base_reserve, reserves.quote_reserve),
            ValidationLevel::Critical,
        )];

        let reference = match self.collaborators.price_feed.fetch_reference_price().await {
            Ok(price) if !(price.is_finite() && price > 0.0) => {
                checks.push(ValidationCheck::failed(
                    "Reference Price",
                    format!("SOL price {} is not a positive number", price),
                    ValidationLevel::Critical,
                ));
                return checks;
            }
            Ok(price) => {
                checks.push(ValidationCheck::ok(
                    "Reference Price",
                    format!("SOL ${:.2}", price),
                    ValidationLevel::Critical,
                ));
                price
            }
            Err(e) => {
                checks.push(ValidationCheck::failed("Reference Price", e.to_string(), ValidationLevel::Critical));
                return checks;
            }
        };

        if let Some(price) = reserves.token_price(reference) {
            let grid = &self.config.grid;
            if grid.contains(price) {
                checks.push(ValidationCheck::ok("Price", format!("${:.6} inside the grid", price), ValidationLevel::Info));
            } else {
                let side = if price < grid.price_low { "below (bot will sell)" } else { "above (bot will hold)" };
                checks.push(ValidationCheck::failed(
                    "Price",
                    format!("${:.6} is {} the grid", price, side),
                    ValidationLevel::Warning,
                ));
            }
        }

        checks
    }

    async fn check_wallet(&self) -> ValidationCheck {
        let rent = match self.collaborators.gateway.rent_exempt_minimum().await {
            Ok(rent) => rent,
            Err(e) => return ValidationCheck::failed("SOL Balance", e.to_string(), ValidationLevel::Warning),
        };
        let needed = ((self.config.trade.sol_amount * LAMPORTS_PER_SOL).floor() as u64).saturating_add(rent);
        match self.collaborators.ledger.fetch_sol_balance().await {
            Ok(lamports) if lamports >= needed => ValidationCheck::ok(
                "SOL Balance",
                format!("{:.4} SOL", lamports as f64 / LAMPORTS_PER_SOL),
                ValidationLevel::Warning,
            ),
            Ok(lamports) => ValidationCheck::failed(
                "SOL Balance",
                format!(
                    "{:.4} SOL does not cover a {:.4} SOL buy plus rent",
                    lamports as f64 / LAMPORTS_PER_SOL,
                    self.config.trade.sol_amount
                ),
                ValidationLevel::Warning,
            ),
            Err(e) => ValidationCheck::failed("SOL Balance", e.to_string(), ValidationLevel::Warning),
        }
    }

    async fn check_token_account(&self, mint: &str) -> ValidationCheck {
        match self.collaborators.ledger.find_token_account(mint).await {
            Ok(Some(account)) => ValidationCheck::ok("Token Account", account, ValidationLevel::Info),
            Ok(None) => ValidationCheck::ok(
                "Token Account",
                "missing; will be created on start",
                ValidationLevel::Info,
            ),
            Err(e) => ValidationCheck::failed("Token Account", e.to_string(), ValidationLevel::Warning),
        }
    }
}
