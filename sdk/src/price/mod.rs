//! Spot-price oracle for the payment asset.
//!
//! This module allows for:
//! - Fetching a spot price for an asset against USD from a simple-price API
//! - Keeping a shared quote that refreshes on a fixed interval
//! - Degrading to the last known (or a hardcoded fallback) quote on failure

use std::time::Duration;

mod client;
mod feed;
mod models;

/// Public simple-price API. Treated as best-effort; no authentication.
pub const PRICE_API_BASE: &str = "https://api.coingecko.com";

/// Fallback spot value used until the first successful fetch. Keeps the
/// USD conversion divisor strictly positive at all times.
pub const DEFAULT_SPOT_USD: f64 = 1.0;

/// How often the background feed re-fetches the quote.
pub const PRICE_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

// Re-exports
pub use {client::*, feed::*, models::*};
