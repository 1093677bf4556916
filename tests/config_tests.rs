// Integration tests for configuration loading and validation

mod common;

use amm_grid_bot::{Config, ConfigError, GridSpec, TradingError};
use common::{create_test_config, TEST_MINT};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_file_round_trip() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");

    let config = create_test_config();
    config.to_file(&config_path).expect("Failed to write config");

    let loaded = Config::from_file(&config_path).expect("Failed to load config");
    assert_eq!(loaded.grid, config.grid);
    assert_eq!(loaded.trade.token_address, TEST_MINT);
    assert_eq!(loaded.polling.confirm_delay_ms, 5);
    assert_eq!(loaded.simulation.volatility, 0.0);
}

#[test]
fn test_example_config_is_valid() {
    let example = include_str!("../config.toml.example");
    let config = Config::from_toml_str(example).expect("Example config should parse");

    assert_eq!(config.grid, GridSpec::new(0.7, 0.8, 100));
    assert_eq!(config.trade.slippage_percent, 1.0);
    assert_eq!(config.polling.interval_seconds, 60);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_missing_file_is_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let result = Config::from_file(temp_dir.path().join("absent.toml"));

    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    let err = TradingError::from(result.unwrap_err());
    assert!(err.user_message().contains("grid-bot init"));
}

#[test]
fn test_load_or_create_writes_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("new.toml");

    let config = Config::load_or_create(&config_path).expect("Should create config");
    assert!(config_path.exists());
    assert_eq!(config.grid, Config::default().grid);

    let reloaded = Config::load_or_create(&config_path).expect("Should load config");
    assert_eq!(reloaded.trade.sol_amount, config.trade.sol_amount);
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("bad.toml");

    fs::write(
        &config_path,
        r#"
        [grid]
        price_low = 0.8
        price_high = 0.7
        level_count = 10
        "#,
    )
    .unwrap();
    assert!(matches!(Config::from_file(&config_path), Err(ConfigError::Grid(_))));

    fs::write(
        &config_path,
        r#"
        [grid]
        price_low = 0.7
        price_high = 0.8
        level_count = 10

        [polling]
        interval_seconds = 0
        "#,
    )
    .unwrap();
    assert!(matches!(Config::from_file(&config_path), Err(ConfigError::Validation(_))));

    fs::write(&config_path, "[grid\nprice_low = ").unwrap();
    assert!(matches!(Config::from_file(&config_path), Err(ConfigError::Parse(_))));
}

#[test]
fn test_zero_levels_rejected() {
    let mut config = create_test_config();
    config.grid = GridSpec::new(0.7, 0.8, 0);

    let err = TradingError::from(config.validate().unwrap_err());
    assert!(matches!(err, TradingError::InvalidGridSpec(_)));
}
