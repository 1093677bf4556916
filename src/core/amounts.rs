// Swap sizing: constant-product output and slippage-adjusted minimums

use crate::config::TradeConfig;
use crate::core::types::{ReserveSnapshot, TradeAction, TradeIntent, LAMPORTS_PER_SOL};
use crate::error::{TradingError, TradingResult};

/// Output of an `x * y = k` swap, ignoring fees.
///
/// All quantities are decimal-adjusted. Returns `None` when the pool math
/// would divide by zero or a reserve is not positive.
pub fn constant_product_out(amount_in: f64, reserve_in: f64, reserve_out: f64) -> Option<f64> {
    if !(reserve_in.is_finite() && reserve_out.is_finite() && amount_in.is_finite()) {
        return None;
    }
    if reserve_in <= 0.0 || reserve_out <= 0.0 || reserve_in + amount_in <= 0.0 {
        return None;
    }
    Some(reserve_out - (reserve_in * reserve_out) / (reserve_in + amount_in))
}

fn slippage_factor(slippage_percent: f64) -> f64 {
    1.0 - slippage_percent / 100.0
}

fn insufficient(reserves: &ReserveSnapshot) -> TradingError {
    TradingError::InsufficientReserves {
        base_reserve: reserves.base_reserve,
        quote_reserve: reserves.quote_reserve,
    }
}

/// Turn a decision into concrete swap amounts.
///
/// Buys spend a fixed `sol_amount`, counted in lamports. Sells spend
/// `sell_percentage` of the current token balance, counted in whole tokens.
/// Minimum outputs are in the output mint's base units.
pub fn compute_amounts(
    action: TradeAction,
    trade: &TradeConfig,
    reserves: &ReserveSnapshot,
    current_base_balance: f64,
) -> TradingResult<TradeIntent> {
    if reserves.is_degenerate() {
        return Err(insufficient(reserves));
    }

    let token_factor = 10f64.powi(reserves.token_decimals as i32);
    let keep = slippage_factor(trade.slippage_percent);

    match action {
        TradeAction::Buy => {
            let amount_in = (trade.sol_amount * LAMPORTS_PER_SOL).floor() as u64;
            let raw_out = constant_product_out(trade.sol_amount, reserves.quote_reserve, reserves.base_reserve)
                .ok_or_else(|| insufficient(reserves))?;
            let minimum_amount_out = (raw_out * keep * token_factor).floor() as u64;

            Ok(TradeIntent { action, amount_in, minimum_amount_out })
        }
        TradeAction::Sell => {
            // Whole tokens; the executor scales to base units for the swap
            let amount_in = (current_base_balance * trade.sell_percentage / 100.0).floor() as u64;
            if amount_in == 0 {
                return Err(TradingError::NothingToSell(current_base_balance));
            }

            let raw_out = constant_product_out(amount_in as f64, reserves.base_reserve, reserves.quote_reserve)
                .ok_or_else(|| insufficient(reserves))?;
            let minimum_amount_out = (raw_out * keep * LAMPORTS_PER_SOL).floor() as u64;

            Ok(TradeIntent { action, amount_in, minimum_amount_out })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade_config(slippage_percent: f64) -> TradeConfig {
        TradeConfig {
            slippage_percent,
            ..TradeConfig::default()
        }
    }

    fn reserves() -> ReserveSnapshot {
        ReserveSnapshot {
            base_reserve: 1_000_000.0,
            quote_reserve: 5_000.0,
            token_decimals: 6,
        }
    }

    #[test]
    fn test_constant_product_out() {
        let out = constant_product_out(10.0, 100.0, 1_000.0).unwrap();
        // 1000 - 100*1000/110
        assert!((out - 90.909_090_909).abs() < 1e-6);
        assert_eq!(constant_product_out(0.0, 100.0, 1_000.0), Some(0.0));
    }

    #[test]
    fn test_constant_product_rejects_degenerate_pools() {
        assert!(constant_product_out(1.0, 0.0, 10.0).is_none());
        assert!(constant_product_out(1.0, 10.0, -1.0).is_none());
        assert!(constant_product_out(-10.0, 10.0, 10.0).is_none());
        assert!(constant_product_out(1.0, f64::INFINITY, 10.0).is_none());
    }

    #[test]
    fn test_buy_amounts() {
        let trade = TradeConfig {
            sol_amount: 0.01,
            slippage_percent: 1.0,
            ..TradeConfig::default()
        };
        let intent = compute_amounts(TradeAction::Buy, &trade, &reserves(), 0.0).unwrap();

        assert_eq!(intent.action, TradeAction::Buy);
        assert_eq!(intent.amount_in, 10_000_000);

        let raw: f64 = 1_000_000.0 - (5_000.0 * 1_000_000.0) / (5_000.0 + 0.01);
        let expected = (raw * (1.0 - 1.0 / 100.0) * 1e6).floor() as u64;
        assert_eq!(intent.minimum_amount_out, expected);
    }

    #[test]
    fn test_sell_amounts_in_whole_tokens() {
        let trade = TradeConfig {
            sell_percentage: 50.0,
            slippage_percent: 2.0,
            ..TradeConfig::default()
        };
        let intent = compute_amounts(TradeAction::Sell, &trade, &reserves(), 1_000.0).unwrap();

        assert_eq!(intent.action, TradeAction::Sell);
        assert_eq!(intent.amount_in, 500);

        let raw: f64 = 5_000.0 - (1_000_000.0 * 5_000.0) / 1_000_500.0;
        let expected = (raw * (1.0 - 2.0 / 100.0) * LAMPORTS_PER_SOL).floor() as u64;
        assert_eq!(intent.minimum_amount_out, expected);
    }

    #[test]
    fn test_sell_floors_partial_tokens() {
        let trade = TradeConfig {
            sell_percentage: 33.0,
            ..TradeConfig::default()
        };
        // 33% of 10.5 is 3.465 tokens
        let intent = compute_amounts(TradeAction::Sell, &trade, &reserves(), 10.5).unwrap();
        assert_eq!(intent.amount_in, 3);

        // Under one whole token is nothing to sell
        let result = compute_amounts(TradeAction::Sell, &trade, &reserves(), 2.5);
        assert!(matches!(result, Err(TradingError::NothingToSell(_))));
    }

    #[test]
    fn test_sell_with_empty_balance() {
        let result = compute_amounts(TradeAction::Sell, &trade_config(1.0), &reserves(), 0.0);
        assert!(matches!(result, Err(TradingError::NothingToSell(_))));
    }

    #[test]
    fn test_minimum_out_decreases_with_slippage() {
        for action in [TradeAction::Buy, TradeAction::Sell] {
            let mut previous = u64::MAX;
            for step in 0..=20 {
                let slippage = step as f64 * 5.0;
                let intent = compute_amounts(action, &trade_config(slippage), &reserves(), 1_000.0).unwrap();
                assert!(
                    intent.minimum_amount_out <= previous,
                    "{:?} minimum out rose at slippage {}",
                    action,
                    slippage
                );
                if step > 0 {
                    assert!(intent.minimum_amount_out < previous);
                }
                previous = intent.minimum_amount_out;
            }
            assert_eq!(previous, 0);
        }
    }

    #[test]
    fn test_insufficient_reserves() {
        let trade = trade_config(1.0);
        for (base, quote) in [(0.0, 5_000.0), (1_000.0, 0.0), (-1.0, 5_000.0), (1_000.0, -3.0)] {
            let snapshot = ReserveSnapshot { base_reserve: base, quote_reserve: quote, token_decimals: 6 };
            for action in [TradeAction::Buy, TradeAction::Sell] {
                let result = compute_amounts(action, &trade, &snapshot, 10.0);
                assert!(
                    matches!(result, Err(TradingError::InsufficientReserves { .. })),
                    "{:?} with base={} quote={} gave {:?}",
                    action,
                    base,
                    quote,
                    result
                );
            }
        }
    }
}
