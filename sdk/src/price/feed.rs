//! Shared, periodically refreshed view of the latest spot price.
//!
//! The feed owns nothing but in-memory state: a quote that starts from the
//! hardcoded fallback and is replaced by each successful fetch, and a
//! loading flag callers can use to stop showing a spinner after the first
//! tick resolves either way.

use {
    crate::price::{PriceClient, PriceQuote},
    std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, RwLock,
        },
        time::Duration,
    },
    tokio::{task::JoinHandle, time::MissedTickBehavior},
};

/// Cheaply clonable read handle over the latest quote.
#[derive(Clone)]
pub struct PriceFeed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    latest: RwLock<PriceQuote>,
    loading: AtomicBool,
}

/// Owns the background refresh task. Dropping the handle aborts the task,
/// so a torn-down feed can never fire another update.
pub struct PriceFeedHandle {
    task: JoinHandle<()>,
}

impl Drop for PriceFeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl PriceFeed {
    /// Creates a feed seeded with the fallback quote and no fetch yet.
    pub fn seeded(asset_id: &str) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                latest: RwLock::new(PriceQuote::fallback(asset_id)),
                loading: AtomicBool::new(true),
            }),
        }
    }

    /// Creates a feed and spawns its refresh task: one fetch immediately,
    /// then one per `interval`. Ticks are independent; a failed tick keeps
    /// the previous quote and is only logged.
    pub fn spawn(
        client: PriceClient,
        asset_id: impl Into<String>,
        interval: Duration,
    ) -> (Self, PriceFeedHandle) {
        let asset_id = asset_id.into();
        let feed = Self::seeded(&asset_id);

        let task_feed = feed.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // The first tick completes immediately.
                ticker.tick().await;
                task_feed.refresh(&client, &asset_id).await;
            }
        });

        (feed, PriceFeedHandle { task })
    }

    /// Performs a single refresh tick against the given client.
    pub async fn refresh(&self, client: &PriceClient, asset_id: &str) {
        match client.spot_price(asset_id).await {
            Ok(quote) => {
                let mut latest = self
                    .inner
                    .latest
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *latest = quote;
            }
            Err(e) => {
                log::warn!(
                    "Price refresh for '{}' failed, keeping last quote: {}",
                    asset_id,
                    e
                );
            }
        }

        self.inner.loading.store(false, Ordering::Release);
    }

    /// The latest quote. Never zero: before the first successful fetch this
    /// is the fallback, afterwards the last fetched value.
    pub fn latest(&self) -> PriceQuote {
        self.inner
            .latest
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// True until the first refresh tick resolves, successfully or not.
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire)
    }
}
