// Reference price feed: SOL in fiat from CoinGecko

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::clients::ReferencePriceFeed;
use crate::config::FeedsConfig;
use crate::error::{TradingError, TradingResult};

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
    asset: String,
    fiat: String,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>, asset: impl Into<String>, fiat: impl Into<String>) -> Self {
        Self::with_timeout(base_url, asset, fiat, Duration::from_secs(10))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        asset: impl Into<String>,
        fiat: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            asset: asset.into(),
            fiat: fiat.into(),
        }
    }

    pub fn from_config(feeds: &FeedsConfig) -> Self {
        Self::with_timeout(
            &feeds.reference_price_url,
            &feeds.reference_asset,
            &feeds.fiat_currency,
            Duration::from_secs(feeds.request_timeout_seconds),
        )
    }

    fn parse_price(&self, json: &Value) -> TradingResult<f64> {
        let price = json
            .get(&self.asset)
            .and_then(|asset| asset.get(&self.fiat))
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                TradingError::PriceFeedUnavailable(format!(
                    "response has no {}/{} price",
                    self.asset, self.fiat
                ))
            })?;

        if !price.is_finite() || price <= 0.0 {
            return Err(TradingError::PriceFeedUnavailable(format!(
                "non-positive {} price: {}",
                self.asset, price
            )));
        }

        Ok(price)
    }
}

#[async_trait]
impl ReferencePriceFeed for CoinGeckoClient {
    async fn fetch_reference_price(&self) -> TradingResult<f64> {
        let url = format!("{}/simple/price", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("ids", self.asset.as_str()), ("vs_currencies", self.fiat.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TradingError::PriceFeedUnavailable(format!(
                "HTTP {} from {}",
                response.status().as_u16(),
                url
            )));
        }

        let json: Value = response.json().await?;
        let price = self.parse_price(&json)?;
        debug!("{} price: {:.4} {}", self.asset, price, self.fiat);
        Ok(price)
    }
}

/// Fixed reference price for offline runs
#[derive(Debug, Clone, Copy)]
pub struct StaticPriceFeed(pub f64);

#[async_trait]
impl ReferencePriceFeed for StaticPriceFeed {
    async fn fetch_reference_price(&self) -> TradingResult<f64> {
        Ok(self.0)
    }
}
