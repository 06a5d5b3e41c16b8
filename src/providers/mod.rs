//! Upstream provider adapters
//!
//! One module per provider. Every adapter translates its provider's
//! format into `NormalizedQuote`s and reports transport, non-2xx and
//! payload-shape problems as errors to the orchestrator; none returns a
//! silently-truncated batch without logging what was dropped.

pub mod types;

pub mod bigpara;
pub mod exchangerate;
pub mod harem;
pub mod investing;
pub mod tcmb;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use types::NormalizedQuote;

/// Default network timeout for provider calls
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// A provider serving current (spot) quotes
#[async_trait]
pub trait SpotProvider: Send + Sync {
    /// Source tag written into quotes, e.g. "harem"
    fn id(&self) -> &'static str;

    /// Fetch the current batch of quotes
    async fn fetch_current(&self) -> Result<Vec<NormalizedQuote>>;
}

/// A provider serving a historical range for one instrument
#[async_trait]
pub trait ArchiveProvider: Send + Sync {
    fn id(&self) -> &'static str;

    /// Fetch daily rows for `market_code` between `start` and `end`
    /// (inclusive), tagged with `instrument_id`
    async fn fetch_history(
        &self,
        instrument_id: &str,
        market_code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NormalizedQuote>>;
}

/// The provider set wired at startup, bundled by role
pub struct Providers {
    pub metals: Arc<dyn SpotProvider>,
    pub fx_primary: Arc<dyn SpotProvider>,
    pub fx_fallback: Arc<dyn SpotProvider>,
    /// Cookie-gated archive; absent when no session cookie is configured
    pub archive_primary: Option<Arc<dyn ArchiveProvider>>,
    pub archive_secondary: Arc<dyn ArchiveProvider>,
}

/// Shared HTTP client with the stack-wide timeout
pub(crate) fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .expect("Failed to create HTTP client")
}
