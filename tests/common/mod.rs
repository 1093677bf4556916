// Common test utilities and helpers

#![allow(dead_code)]

use amm_grid_bot::{Collaborators, Config, GridSpec, GridTrader, ReserveSnapshot, SimulatedChain, StaticPriceFeed};
use std::sync::Arc;

pub const TEST_MINT: &str = "TestMint1111111111111111111111111111111111";
pub const REFERENCE_PRICE: f64 = 150.0;

/// Grid 0.7 - 0.8 with 100 levels and a confirmation budget measured in milliseconds
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.grid = GridSpec::new(0.7, 0.8, 100);
    config.trade.token_address = TEST_MINT.to_string();
    config.trade.sol_amount = 0.01;
    config.trade.slippage_percent = 1.0;
    config.trade.sell_percentage = 100.0;
    config.polling.interval_seconds = 1;
    config.polling.confirm_attempts = 3;
    config.polling.confirm_delay_ms = 5;
    config.polling.confirm_timeout_seconds = 1;
    config.simulation.volatility = 0.0;
    config
}

/// Pool quoting `price`, a 1 SOL wallet and no token account
pub fn create_chain(price: f64) -> SimulatedChain {
    let chain = SimulatedChain::new(
        TEST_MINT,
        ReserveSnapshot {
            base_reserve: 1_000_000.0,
            quote_reserve: 5_000.0,
            token_decimals: 6,
        },
    )
    .with_sol_balance(1_000_000_000);
    chain.set_price(price, REFERENCE_PRICE);
    chain
}

/// Pool quoting `price` with an existing token account holding `tokens`
pub fn create_funded_chain(price: f64, tokens: f64) -> Arc<SimulatedChain> {
    Arc::new(create_chain(price).with_token_account(tokens))
}

pub fn collaborators(chain: &Arc<SimulatedChain>) -> Collaborators {
    Collaborators::from_chain(chain.clone(), Arc::new(StaticPriceFeed(REFERENCE_PRICE)))
}

pub async fn start_trader(config: Config, chain: &Arc<SimulatedChain>) -> GridTrader {
    GridTrader::start(config, collaborators(chain))
        .await
        .expect("Trader should start")
}
