// =============================================================================
// MarketSource — anything that can produce a NormalizedMarket for a ZIP code
// =============================================================================
//
// Implemented by the upstream RentCast client and by the cache that wraps it.
// `fetch_market` keeps failures typed; `fetch_one` / `fetch_many` collapse them
// to "missing" for the dashboard after logging.
// =============================================================================

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{error, warn};

use crate::error::FetchError;
use crate::market::model::NormalizedMarket;

#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Fetch one market, reporting why nothing came back.
    async fn fetch_market(&self, zip: &str) -> Result<NormalizedMarket, FetchError>;

    /// Fetch one market; every failure becomes `None` after being logged.
    async fn fetch_one(&self, zip: &str) -> Option<NormalizedMarket> {
        match self.fetch_market(zip).await {
            Ok(market) => Some(market),
            Err(e) if e.is_no_data() => {
                warn!(zip, "no market data returned");
                None
            }
            Err(e) => {
                error!(zip, error = %e, "market fetch failed");
                None
            }
        }
    }

    /// Fetch every ZIP concurrently and wait for all of them to settle.
    /// Results come back in request order.
    async fn fetch_all(&self, zips: &[String]) -> Vec<(String, Result<NormalizedMarket, FetchError>)> {
        let results = join_all(zips.iter().map(|zip| self.fetch_market(zip))).await;
        zips.iter().cloned().zip(results).collect()
    }

    /// Like [`fetch_all`](Self::fetch_all) but keeps only the markets that
    /// arrived. Partial results are not an error.
    async fn fetch_many(&self, zips: &[String]) -> Vec<NormalizedMarket> {
        let results = join_all(zips.iter().map(|zip| self.fetch_one(zip))).await;
        results.into_iter().flatten().collect()
    }
}
