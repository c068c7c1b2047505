//! Simple-price API client implementation
//!
//! This module provides a thin client for fetching spot prices from a
//! CoinGecko-shaped simple-price endpoint.

use {
    crate::price::{models::SpotEntry, PriceQuote, PRICE_API_BASE},
    chrono::Utc,
    reqwest::Client,
    std::collections::HashMap,
    thiserror::Error,
};

/// Error type for spot-price fetches
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Price API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse price response: {0}")]
    Parse(String),

    #[error("No quote for '{0}' in price response")]
    MissingAsset(String),

    #[error("Non-positive spot price for '{0}'")]
    NonPositive(String),
}

/// Client for the public simple-price API
pub struct PriceClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the price API
    base_url: String,
}

impl PriceClient {
    /// Creates a new price client, optionally pointed at a non-default base
    /// URL (used by tests)
    pub fn new(base_url: Option<&str>) -> Self {
        let base_url = base_url.unwrap_or(PRICE_API_BASE).to_string();

        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Fetches the current spot price of `asset_id` against USD.
    ///
    /// A response that is missing the asset, or that carries a zero or
    /// negative value, is an error; the caller keeps its previous quote.
    pub async fn spot_price(&self, asset_id: &str) -> Result<PriceQuote, PriceError> {
        let url = format!(
            "{}/api/v3/simple/price?ids={}&vs_currencies=usd",
            self.base_url, asset_id
        );

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(PriceError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: HashMap<String, SpotEntry> =
            serde_json::from_str(&text).map_err(|e| PriceError::Parse(e.to_string()))?;

        let entry = parsed
            .get(asset_id)
            .ok_or_else(|| PriceError::MissingAsset(asset_id.to_string()))?;

        if entry.usd <= 0.0 {
            return Err(PriceError::NonPositive(asset_id.to_string()));
        }

        Ok(PriceQuote {
            pair: format!("{}-usd", asset_id),
            usd_value: entry.usd,
            fetched_at: Utc::now(),
        })
    }
}
