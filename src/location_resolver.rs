//! Location Resolution Module
//!
//! This module resolves free-text addresses into [`Location`]s through the
//! persistent cache first and the geocoding provider second. A cache hit
//! never touches the network.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::cache::LocationStore;
use crate::error::EmissionsError;
use crate::geocoding::{GeocodeStats, GeocodingProvider, UsageSummary};
use crate::models::Location;

/// Cached geocoding service
pub struct GeocodeResolver {
    store: Arc<LocationStore>,
    provider: Box<dyn GeocodingProvider>,
    language: String,
    timeout: Duration,
    stats: GeocodeStats,
}

impl GeocodeResolver {
    pub fn new(
        store: Arc<LocationStore>,
        provider: Box<dyn GeocodingProvider>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            language: language.into(),
            timeout,
            stats: GeocodeStats::new(),
        }
    }

    /// Resolve an address into a structured Location
    #[instrument(skip(self))]
    pub async fn resolve(&self, address: &str) -> Result<Location, EmissionsError> {
        if is_missing_place(address) {
            debug!("Address <{}> has no place name", address);
            return Err(EmissionsError::location_not_found(address));
        }

        if let Some(location) = self.store.get(address).await {
            self.stats.record_cache_hit();
            return Ok(location);
        }

        self.stats.record_api_call();
        debug!("Geocoding <{}>", address);

        let location = tokio::time::timeout(self.timeout, self.provider.geocode(address, &self.language))
            .await
            .map_err(|_| {
                debug!("Geocoding <{}> timed out after {:?}", address, self.timeout);
                EmissionsError::location_not_found(address)
            })??
            .ok_or_else(|| EmissionsError::location_not_found(address))?;

        debug!(
            "Resolved <{}> to {} ({})",
            address,
            location.address,
            location.format_coordinates()
        );

        self.store.put(address, location.clone()).await;
        if let Err(e) = self.store.flush(false).await {
            warn!("Location cache not written, will retry later: {}", e);
        }

        Ok(location)
    }

    /// API calls and cache hits so far
    #[must_use]
    pub fn usage(&self) -> UsageSummary {
        self.stats.snapshot()
    }

    /// Log the usage summary and write the cache document.
    ///
    /// A failed write only loses resolutions for later runs, so it is logged
    /// and the run's results are kept.
    pub async fn finish(&self) -> UsageSummary {
        let usage = self.usage();
        info!("API calls: {}, cache hits: {}", usage.api_calls, usage.cache_hits);
        if let Err(e) = self.store.flush(true).await {
            error!(
                "Failed to write location cache {}: {}",
                self.store.path().display(),
                e
            );
        }
        usage
    }

    #[must_use]
    pub fn store(&self) -> &LocationStore {
        &self.store
    }
}

/// Addresses built from a blank city, e.g. `" (Italie)"` or a spreadsheet's
/// `"nan (Italie)"` and bare `"nan"`
#[must_use]
pub fn is_missing_place(address: &str) -> bool {
    let address = address.trim();
    address.is_empty()
        || address.starts_with('(')
        || address.eq_ignore_ascii_case("nan")
        || address.starts_with("nan (")
}
