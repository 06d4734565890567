//! Geocoding provider boundary
//!
//! The pipeline only needs one operation from a provider: turn a free-text
//! address into a location, or report that nothing matched.

pub mod opencage;

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use opentelemetry::metrics::Counter;

use crate::error::EmissionsError;
use crate::models::Location;

pub use opencage::OpenCageClient;

/// A forward geocoding service
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Resolve `address`, returning `Ok(None)` when the provider has no match.
    async fn geocode(
        &self,
        address: &str,
        language: &str,
    ) -> Result<Option<Location>, EmissionsError>;
}

/// API-call and cache-hit tallies for a run
pub struct GeocodeStats {
    api_calls: AtomicU64,
    cache_hits: AtomicU64,
    api_calls_counter: Counter<u64>,
    cache_hits_counter: Counter<u64>,
}

impl GeocodeStats {
    #[must_use]
    pub fn new() -> Self {
        let meter = opentelemetry::global::meter("mission_co2");
        Self {
            api_calls: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            api_calls_counter: meter
                .u64_counter("geocode.api_calls")
                .with_description("Geocoding provider calls")
                .build(),
            cache_hits_counter: meter
                .u64_counter("geocode.cache_hits")
                .with_description("Addresses served from the location cache")
                .build(),
        }
    }

    pub fn record_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.api_calls_counter.add(1, &[]);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        self.cache_hits_counter.add(1, &[]);
    }

    #[must_use]
    pub fn snapshot(&self) -> UsageSummary {
        UsageSummary {
            api_calls: self.api_calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

impl Default for GeocodeStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageSummary {
    pub api_calls: u64,
    pub cache_hits: u64,
}
