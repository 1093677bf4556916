// Integration tests for the polling loop against the simulated pool

mod common;

use amm_grid_bot::core::types::Instruction;
use amm_grid_bot::{
    ConfirmationMode, Decision, GridSignal, GridTrader, Recovery, ReferencePriceFeed, SkipReason, TradeAction,
    TradeMemory, TradingError, TradingResult,
};
use async_trait::async_trait;
use common::{collaborators, create_chain, create_funded_chain, create_test_config, start_trader, REFERENCE_PRICE};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct FailingFeed;

/// Feed that answers with a fixed, possibly nonsensical, SOL price
struct FixedFeed(f64);

#[async_trait]
impl ReferencePriceFeed for FixedFeed {
    async fn fetch_reference_price(&self) -> TradingResult<f64> {
        Ok(self.0)
    }
}

#[async_trait]
impl ReferencePriceFeed for FailingFeed {
    async fn fetch_reference_price(&self) -> TradingResult<f64> {
        Err(TradingError::PriceFeedUnavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn test_sell_when_price_over_nearest_level() {
    let chain = create_funded_chain(0.705, 1_000.0);
    let mut trader = start_trader(create_test_config(), &chain).await;

    let report = trader.run_cycle().await.expect("Cycle should succeed");

    assert!(matches!(report.signal, GridSignal::OverLevel(_)));
    assert_eq!(report.decision, Decision::Trade(TradeAction::Sell));
    assert!(report.traded());
    assert_eq!(report.intent.unwrap().amount_in, 1_000);
    assert_eq!(*trader.memory(), TradeMemory::with_last_trade(report.price, TradeAction::Sell));
    assert_eq!(chain.token_balance(), 0.0);
}

#[tokio::test]
async fn test_below_range_sells_without_prior_trade() {
    let chain = create_funded_chain(0.65, 500.0);
    let mut trader = start_trader(create_test_config(), &chain).await;

    let report = trader.run_cycle().await.expect("Cycle should succeed");

    assert_eq!(report.signal, GridSignal::BelowRange);
    assert_eq!(report.decision, Decision::Trade(TradeAction::Sell));
    assert_eq!(trader.memory().last_trade_action(), Some(TradeAction::Sell));
}

#[tokio::test]
async fn test_below_range_sell_intended_regardless_of_memory() {
    let chain = create_funded_chain(0.65, 500.0);
    let trader = start_trader(create_test_config(), &chain).await;
    let mut trader = trader.with_memory(TradeMemory::with_last_trade(0.6, TradeAction::Buy));

    let report = trader.run_cycle().await.expect("Cycle should succeed");
    assert_eq!(report.signal, GridSignal::BelowRange);
    assert_eq!(report.decision, Decision::Trade(TradeAction::Sell));

    // Liquidation below the last trade price is still held back
    chain.set_price(0.62, REFERENCE_PRICE);
    let report = trader.run_cycle().await.expect("Cycle should succeed");
    assert_eq!(report.signal, GridSignal::BelowRange);
    assert!(matches!(
        report.decision,
        Decision::Skip { intended: TradeAction::Sell, reason: SkipReason::SellNotAboveLastTrade { .. } }
    ));
}

#[tokio::test]
async fn test_above_range_holds() {
    let chain = create_funded_chain(0.85, 500.0);
    let mut trader = start_trader(create_test_config(), &chain).await;

    let report = trader.run_cycle().await.expect("Cycle should succeed");

    assert_eq!(report.signal, GridSignal::AboveRange);
    assert_eq!(report.decision, Decision::Hold);
    assert!(report.intent.is_none());
    assert!(trader.memory().is_empty());
    assert!(chain.submitted_bundles().is_empty());
}

#[tokio::test]
async fn test_second_buy_is_suppressed() {
    let chain = create_funded_chain(0.7049, 0.0);
    let mut trader = start_trader(create_test_config(), &chain).await;

    let first = trader.run_cycle().await.expect("Cycle should succeed");
    assert!(matches!(first.signal, GridSignal::UnderLevel(_)));
    assert_eq!(first.decision, Decision::Trade(TradeAction::Buy));
    assert_eq!(trader.memory().last_trade_action(), Some(TradeAction::Buy));
    assert!(chain.token_balance() > 0.0);

    chain.set_price(0.7049, REFERENCE_PRICE);
    let second = trader.run_cycle().await.expect("Cycle should succeed");
    assert!(matches!(second.signal, GridSignal::UnderLevel(_)));
    assert_eq!(
        second.decision,
        Decision::Skip { intended: TradeAction::Buy, reason: SkipReason::RepeatedBuy }
    );
    assert_eq!(chain.submitted_bundles().len(), 1);
}

#[tokio::test]
async fn test_buy_then_profitable_sell_then_buy() {
    let chain = create_funded_chain(0.7049, 0.0);
    let mut trader = start_trader(create_test_config(), &chain).await;

    let buy = trader.run_cycle().await.unwrap();
    assert_eq!(buy.decision, Decision::Trade(TradeAction::Buy));
    let bought = chain.token_balance();

    chain.set_price(0.7201, REFERENCE_PRICE);
    let sell = trader.run_cycle().await.unwrap();
    assert_eq!(sell.decision, Decision::Trade(TradeAction::Sell));
    let sold = sell.intent.unwrap().amount_in;
    assert_eq!(sold, bought.floor() as u64);
    assert!((chain.token_balance() - (bought - sold as f64)).abs() < 1e-5);

    chain.set_price(0.7149, REFERENCE_PRICE);
    let rebuy = trader.run_cycle().await.unwrap();
    assert_eq!(rebuy.decision, Decision::Trade(TradeAction::Buy));
    assert_eq!(trader.memory().last_trade_action(), Some(TradeAction::Buy));
}

#[tokio::test]
async fn test_confirmation_timeout_leaves_memory() {
    let chain = create_funded_chain(0.7049, 0.0);
    let trader = start_trader(create_test_config(), &chain).await;
    let seeded = TradeMemory::with_last_trade(0.72, TradeAction::Sell);
    let mut trader = trader.with_memory(seeded);
    chain.set_mode(ConfirmationMode::NeverConfirms);

    let result = trader.run_cycle().await;

    assert!(matches!(result, Err(TradingError::TradeSubmissionFailed(_))));
    assert_eq!(*trader.memory(), seeded);
    assert_eq!(chain.submitted_bundles().len(), 1);
    assert_eq!(chain.token_balance(), 0.0);
}

#[tokio::test]
async fn test_rejected_and_failed_trades_leave_memory() {
    let chain = create_funded_chain(0.7049, 0.0);
    let mut trader = start_trader(create_test_config(), &chain).await;

    chain.set_mode(ConfirmationMode::Rejected);
    let result = trader.run_cycle().await;
    assert!(matches!(result, Err(TradingError::TradeSubmissionFailed(_))));
    assert!(trader.memory().is_empty());

    chain.set_mode(ConfirmationMode::FailsOnChain);
    let result = trader.run_cycle().await;
    assert!(matches!(result, Err(TradingError::TradeSubmissionFailed(_))));
    assert!(trader.memory().is_empty());

    // Next cycle decides afresh and the buy goes through
    chain.set_mode(ConfirmationMode::Lands);
    let report = trader.run_cycle().await.unwrap();
    assert_eq!(report.decision, Decision::Trade(TradeAction::Buy));
    assert_eq!(trader.memory().last_trade_action(), Some(TradeAction::Buy));
}

#[tokio::test]
async fn test_bootstrap_creates_token_account_once() {
    let chain = Arc::new(create_chain(0.75));
    assert!(chain.token_account().is_none());

    let trader = start_trader(create_test_config(), &chain).await;
    assert!(trader.bootstrapped());
    assert!(trader.memory().is_empty());
    assert_eq!(chain.token_account().as_deref(), Some(trader.token_account()));

    let bundles = chain.submitted_bundles();
    assert_eq!(bundles.len(), 1);
    assert!(bundles[0]
        .instructions
        .iter()
        .any(|ix| matches!(ix, Instruction::CreateAssociatedTokenAccount { .. })));
    match bundles[0].swap() {
        Some(Instruction::Swap { amount_in, minimum_amount_out, .. }) => {
            assert_eq!(*amount_in, 0);
            assert_eq!(*minimum_amount_out, 0);
        }
        other => panic!("Expected zero swap, got {:?}", other),
    }

    let again = start_trader(create_test_config(), &chain).await;
    assert!(!again.bootstrapped());
    assert_eq!(chain.submitted_bundles().len(), 1);
}

#[tokio::test]
async fn test_bootstrap_failure_is_fatal_at_start() {
    let chain = Arc::new(create_chain(0.75).with_mode(ConfirmationMode::Rejected));
    let result = GridTrader::start(create_test_config(), collaborators(&chain)).await;

    assert!(matches!(result, Err(TradingError::TradeSubmissionFailed(_))));
    assert!(chain.token_account().is_none());
}

#[tokio::test]
async fn test_unknown_token_fails_start() {
    let chain = create_funded_chain(0.75, 0.0);
    let mut config = create_test_config();
    config.trade.token_address = "UnknownMint".to_string();

    let err = GridTrader::start(config, collaborators(&chain))
        .await
        .err()
        .expect("Start should fail");
    assert!(matches!(err, TradingError::PoolResolution(_)));
    assert_eq!(err.recovery(), Recovery::Fatal);
}

#[tokio::test]
async fn test_degenerate_reserves_skip_cycle() {
    let chain = create_funded_chain(0.75, 10.0);
    let mut trader = start_trader(create_test_config(), &chain).await;
    chain.set_reserves(0.0, 5_000.0);

    let err = trader.run_cycle().await.err().expect("Cycle should fail");
    assert!(matches!(err, TradingError::InsufficientReserves { .. }));
    assert_eq!(err.recovery(), Recovery::SkipCycle);
}

#[tokio::test]
async fn test_sell_with_empty_wallet_is_skipped() {
    let chain = create_funded_chain(0.65, 0.0);
    let mut trader = start_trader(create_test_config(), &chain).await;

    let result = trader.run_cycle().await;
    assert!(matches!(result, Err(TradingError::NothingToSell(_))));
    assert!(trader.memory().is_empty());
    assert!(chain.submitted_bundles().is_empty());
}

#[tokio::test]
async fn test_sell_spends_percentage_of_whole_tokens() {
    let chain = create_funded_chain(0.705, 1_000.0);
    let mut config = create_test_config();
    config.trade.sell_percentage = 50.0;
    let mut trader = start_trader(config, &chain).await;

    let report = trader.run_cycle().await.expect("Cycle should succeed");

    assert_eq!(report.decision, Decision::Trade(TradeAction::Sell));
    assert_eq!(report.intent.unwrap().amount_in, 500);
    match chain.submitted_bundles()[0].swap() {
        Some(Instruction::Swap { amount_in, .. }) => assert_eq!(*amount_in, 500_000_000),
        other => panic!("Expected swap, got {:?}", other),
    }
    assert!((chain.token_balance() - 500.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_unusable_reference_price_skips_cycle() {
    for reference in [f64::NAN, 0.0, -150.0, f64::INFINITY] {
        let chain = create_funded_chain(0.705, 1_000.0);
        let mut collab = collaborators(&chain);
        collab.price_feed = Arc::new(FixedFeed(reference));
        let trader = GridTrader::start(create_test_config(), collab).await.unwrap();
        let seeded = TradeMemory::with_last_trade(0.70, TradeAction::Buy);
        let mut trader = trader.with_memory(seeded);

        let err = trader.run_cycle().await.err().expect("Cycle should fail");

        assert!(matches!(err, TradingError::PriceFeedUnavailable(_)), "{} gave {:?}", reference, err);
        assert_eq!(err.recovery(), Recovery::SkipCycle);
        assert_eq!(*trader.memory(), seeded);
        assert!(chain.submitted_bundles().is_empty());
        assert_eq!(chain.token_balance(), 1_000.0);
    }
}

#[tokio::test]
async fn test_loop_survives_failing_feed() {
    let chain = create_funded_chain(0.75, 0.0);
    let mut collab = collaborators(&chain);
    collab.price_feed = Arc::new(FailingFeed);
    let mut trader = GridTrader::start(create_test_config(), collab).await.unwrap();

    let stats = trader
        .run(Some(2), std::future::pending::<()>())
        .await
        .expect("Loop should not abort on a feed failure");

    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.failed_cycles, 2);
    assert_eq!(stats.trades(), 0);
}

#[tokio::test]
async fn test_loop_counts_trades() {
    let chain = create_funded_chain(0.7049, 0.0);
    let mut trader = start_trader(create_test_config(), &chain).await;

    let stats = trader.run(Some(1), std::future::pending::<()>()).await.unwrap();

    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.buys, 1);
    assert_eq!(stats.failed_cycles, 0);
}

#[tokio::test]
async fn test_shutdown_abandons_confirmation_wait() {
    let chain = create_funded_chain(0.7049, 0.0);
    let mut config = create_test_config();
    config.polling.confirm_attempts = 10_000;
    config.polling.confirm_delay_ms = 10;
    config.polling.confirm_timeout_seconds = 60;
    let mut trader = start_trader(config, &chain).await;
    chain.set_mode(ConfirmationMode::NeverConfirms);

    let started = Instant::now();
    let stats = trader
        .run(None, tokio::time::sleep(Duration::from_millis(100)))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(stats.cycles, 0);
    assert!(trader.memory().is_empty());
    assert_eq!(chain.submitted_bundles().len(), 1);
}
