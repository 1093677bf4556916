// Pair address lookup through the DexScreener token API

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::FeedsConfig;
use crate::core::types::WSOL_MINT;
use crate::error::{TradingError, TradingResult};

#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    #[serde(default)]
    pairs: Option<Vec<PairInfo>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairInfo {
    pub dex_id: String,
    pub pair_address: String,
    pub base_token: TokenInfo,
    pub quote_token: TokenInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub address: String,
    #[serde(default)]
    pub symbol: String,
}

impl PairInfo {
    fn is_sol_pair(&self) -> bool {
        self.base_token.address == WSOL_MINT || self.quote_token.address == WSOL_MINT
    }
}

#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    client: reqwest::Client,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(feeds: &FeedsConfig) -> Self {
        Self::with_timeout(&feeds.pair_lookup_url, Duration::from_secs(feeds.request_timeout_seconds))
    }

    /// All pairs the API knows for `token_address`
    pub async fn fetch_pairs(&self, token_address: &str) -> TradingResult<Vec<PairInfo>> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, token_address);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TradingError::PoolResolution(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TradingError::PoolResolution(format!(
                "HTTP {} from {}",
                response.status().as_u16(),
                url
            )));
        }

        let body: TokenPairsResponse = response
            .json()
            .await
            .map_err(|e| TradingError::PoolResolution(format!("bad pair response: {}", e)))?;

        Ok(body.pairs.unwrap_or_default())
    }

    /// Raydium SOL pair for the token, falling back to any Raydium pair
    pub async fn resolve_pair_address(&self, token_address: &str) -> TradingResult<String> {
        let pairs = self.fetch_pairs(token_address).await?;
        debug!("{} pairs listed for {}", pairs.len(), token_address);

        select_raydium_pair(&pairs)
            .map(|pair| pair.pair_address.clone())
            .ok_or_else(|| TradingError::PoolResolution(format!("no Raydium pair for {}", token_address)))
    }
}

/// Raydium SOL pair if listed, else the first Raydium pair
pub fn select_raydium_pair(pairs: &[PairInfo]) -> Option<&PairInfo> {
    let mut raydium = pairs.iter().filter(|p| p.dex_id == "raydium");
    let first = raydium.clone().next();
    raydium.find(|p| p.is_sol_pair()).or(first)
}
