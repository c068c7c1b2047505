//! Data models for the spot-price endpoint

use {
    crate::price::DEFAULT_SPOT_USD,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// A fetched spot price. Immutable once created; a newer fetch supersedes
/// the whole quote, it is never merged into one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// The currency pair this quote is for, e.g. "ergo-usd"
    pub pair: String,
    /// USD value of one unit of the asset. Always strictly positive.
    pub usd_value: f64,
    /// When the quote was fetched (or constructed, for the fallback)
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    /// The hardcoded quote a feed starts from so that downstream USD
    /// conversion never divides by zero before the first fetch lands.
    pub fn fallback(asset_id: &str) -> Self {
        Self {
            pair: format!("{}-usd", asset_id),
            usd_value: DEFAULT_SPOT_USD,
            fetched_at: Utc::now(),
        }
    }
}

/// Per-asset entry in the simple-price response, e.g. `{"usd": 0.55}`
#[derive(Debug, Clone, Deserialize)]
pub struct SpotEntry {
    /// The asset's USD value as reported by the API
    pub usd: f64,
}
