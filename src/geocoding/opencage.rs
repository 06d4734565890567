//! OpenCage forward geocoding client

use std::time::Duration;

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::GeocodingProvider;
use crate::config::GeocodingConfig;
use crate::error::EmissionsError;
use crate::models::Location;

/// OpenCage API client
pub struct OpenCageClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

/// Search response from the OpenCage API
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted: String,
    geometry: Geometry,
    #[serde(default)]
    components: Components,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Components {
    #[serde(rename = "ISO_3166-1_alpha-2")]
    country_code: Option<String>,
}

impl From<GeocodeResult> for Location {
    fn from(result: GeocodeResult) -> Self {
        Location {
            address: result.formatted,
            latitude: result.geometry.lat,
            longitude: result.geometry.lng,
            country_code: result
                .components
                .country_code
                .map(|code| code.to_uppercase()),
        }
    }
}

impl OpenCageClient {
    /// Create a new client. An API key is mandatory for OpenCage.
    pub fn new(config: &GeocodingConfig) -> Result<Self, EmissionsError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| EmissionsError::config("geocoding.api_key is required"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("mission_co2/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EmissionsError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, address: &str, language: &str) -> String {
        format!(
            "{}/json?q={}&key={}&language={}&limit=1&no_annotations=1",
            self.base_url,
            urlencoding::encode(address),
            urlencoding::encode(&self.api_key),
            urlencoding::encode(language),
        )
    }
}

#[async_trait]
impl GeocodingProvider for OpenCageClient {
    #[instrument(name = "opencage_geocode", skip(self))]
    async fn geocode(
        &self,
        address: &str,
        language: &str,
    ) -> Result<Option<Location>, EmissionsError> {
        let response = self
            .client
            .get(self.search_url(address, language))
            .send()
            .await
            .map_err(|e| EmissionsError::geocoding(format!("OpenCage request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return match status.as_u16() {
                401 | 403 => Err(EmissionsError::config(
                    "Invalid or unauthorized OpenCage API key",
                )),
                402 | 429 => Err(EmissionsError::geocoding(
                    "OpenCage rate limit or quota exceeded",
                )),
                _ => Err(EmissionsError::geocoding(format!(
                    "OpenCage API error {status}: {error_text}"
                ))),
            };
        }

        let body: GeocodeResponse = response.json().await.map_err(|e| {
            EmissionsError::geocoding(format!("Failed to parse OpenCage response: {e}"))
        })?;

        let location = first_location(body);
        match &location {
            Some(location) => debug!(
                "Found {} ({})",
                location.address,
                location.format_coordinates()
            ),
            None => warn!("OpenCage has no match for <{}>", address),
        }
        Ok(location)
    }
}

fn first_location(body: GeocodeResponse) -> Option<Location> {
    body.results.into_iter().next().map(Location::from)
}
