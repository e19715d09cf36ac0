//! Background catalog refresh
//!
//! `CatalogFetcher` periodically GETs the item list from the configured
//! endpoint, parses it, and swaps it into the shared handle. A failed fetch
//! or parse leaves the previous catalog in place; the pipeline keeps running
//! in pass-through mode until a refresh lands.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::catalog::{Catalog, SharedCatalog};
use crate::error::Result;

/// Default interval between refreshes
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// HTTP timeout for one fetch
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Periodic catalog refresher.
///
/// Runs in its own background task and communicates with readers only
/// through the [`SharedCatalog`] swap.
pub struct CatalogFetcher {
    url: String,
    interval: Duration,
    shared: SharedCatalog,
    http_client: reqwest::Client,
}

impl CatalogFetcher {
    /// Create a fetcher that refreshes `shared` from `url`.
    ///
    /// Fails if the HTTP client cannot be constructed (a misconfigured TLS
    /// backend, typically).
    pub fn new(url: impl Into<String>, shared: SharedCatalog) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            url: url.into(),
            interval: DEFAULT_REFRESH_INTERVAL,
            shared,
            http_client,
        })
    }

    /// Override the refresh interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Fetch and swap once.
    ///
    /// Returns the entry count of the new table. On error the shared handle
    /// is untouched.
    pub async fn refresh_once(&self) -> Result<usize> {
        debug!(url = %self.url, "fetching catalog");
        let body = self
            .http_client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let catalog = Catalog::from_json_slice(&body)?;
        let count = catalog.len();
        self.shared.swap(catalog);
        Ok(count)
    }

    /// Run the refresh loop forever.
    ///
    /// Spawn this as a background task. Failures are logged and the loop
    /// continues; they are never fatal.
    pub async fn run(self) {
        loop {
            match self.refresh_once().await {
                Ok(entries) => info!(entries, "catalog refreshed"),
                Err(e) => {
                    warn!(error = %e, "catalog refresh failed, keeping previous catalog")
                }
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
#[path = "fetch_test.rs"]
mod tests;
