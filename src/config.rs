//! Configuration management for `MissionCO2`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::EmissionsError;
use crate::emissions::EmissionFactorTable;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Geocoding provider configuration
    pub geocoding: GeocodingConfig,
    /// Location cache configuration
    pub cache: CacheConfig,
    /// Transport mode vocabulary
    pub transport: TransportConfig,
    /// Round-trip column values
    pub round_trip: RoundTripConfig,
    /// Emission factor table
    pub emissions: EmissionFactorTable,
    /// Row processing settings
    pub processing: ProcessingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Metrics export configuration
    pub telemetry: TelemetryConfig,
}

/// Geocoding provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    /// OpenCage API key
    pub api_key: Option<String>,
    /// Base URL of the geocoding API
    pub base_url: String,
    /// Language hint sent with every lookup
    pub language: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    pub max_retries: u32,
}

/// Location cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache document location
    pub path: String,
    /// Number of new entries between two opportunistic writes
    pub flush_every: usize,
}

/// Transport tags recognized in the mission data, compared case-insensitively
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Separator between tags in one cell
    pub delimiter: char,
    pub plane: Vec<String>,
    pub train: Vec<String>,
    pub car: Vec<String>,
    /// Known modes that carry no emissions of their own (bus, metro, ...)
    pub ignored: Vec<String>,
}

/// Round-trip column settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundTripConfig {
    /// Values meaning "round trip", compared case-insensitively
    pub yes_values: Vec<String>,
}

/// Row processing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of trips resolved concurrently
    pub concurrency: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or compact)
    pub format: String,
}

/// Metrics export settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TelemetryConfig {
    /// OTLP/HTTP metrics endpoint; metrics stay in-process when unset
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_geocoding_base_url() -> String {
    "https://api.opencagedata.com/geocode/v1".to_string()
}

fn default_cache_path() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("mission_co2").join("geocache.json"))
        .unwrap_or_else(|| PathBuf::from("geocache.json"))
        .to_string_lossy()
        .into_owned()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_geocoding_base_url(),
            language: "fr".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            flush_every: crate::cache::DEFAULT_FLUSH_EVERY,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            plane: strings(&["avion", "plane", "flight"]),
            train: strings(&["train", "tgv", "ter", "rail"]),
            car: strings(&[
                "voiture",
                "car",
                "véhicule personnel",
                "location de véhicule",
                "taxi",
            ]),
            ignored: strings(&[
                "bus", "metro", "métro", "tram", "rer", "navette", "autocar", "bateau", "ferry",
                "vélo",
            ]),
        }
    }
}

impl Default for RoundTripConfig {
    fn default() -> Self {
        Self {
            yes_values: strings(&["oui", "yes", "y", "ar", "a/r"]),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. MISSION_CO2_GEOCODING__API_KEY
        builder = builder.add_source(
            Environment::with_prefix("MISSION_CO2")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mission_co2").join("config.toml"))
    }

    /// Apply default values to empty configuration fields
    pub fn apply_defaults(&mut self) {
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.language.is_empty() {
            self.geocoding.language = GeocodingConfig::default().language;
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = GeocodingConfig::default().timeout_seconds;
        }
        if self.cache.path.is_empty() {
            self.cache.path = default_cache_path();
        }
        if self.cache.flush_every == 0 {
            self.cache.flush_every = crate::cache::DEFAULT_FLUSH_EVERY;
        }
        if self.processing.concurrency == 0 {
            self.processing.concurrency = 1;
        }
        if self.round_trip.yes_values.is_empty() {
            self.round_trip.yes_values = RoundTripConfig::default().yes_values;
        }
        if self.logging.level.is_empty() {
            self.logging.level = LoggingConfig::default().level;
        }
        if self.logging.format.is_empty() {
            self.logging.format = LoggingConfig::default().format;
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.emissions.validate()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.geocoding.timeout_seconds > 300 {
            return Err(
                EmissionsError::config("Geocoding timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.geocoding.max_retries > 10 {
            return Err(EmissionsError::config("Geocoding max retries cannot exceed 10").into());
        }

        if self.processing.concurrency > 64 {
            return Err(EmissionsError::config("Processing concurrency cannot exceed 64").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(EmissionsError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "compact"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(EmissionsError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.geocoding.base_url.starts_with("http://")
            && !self.geocoding.base_url.starts_with("https://")
        {
            return Err(EmissionsError::config(
                "Geocoding base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if self.transport.delimiter.is_alphanumeric() {
            return Err(EmissionsError::config(
                "Transport tag delimiter cannot be a letter or digit",
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(
            config.geocoding.base_url,
            "https://api.opencagedata.com/geocode/v1"
        );
        assert_eq!(config.geocoding.timeout_seconds, 30);
        assert_eq!(config.geocoding.language, "fr");
        assert_eq!(config.cache.flush_every, 100);
        assert_eq!(config.logging.level, "info");
        assert!(config.geocoding.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = AppConfig::default();
        config.geocoding.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_invalid_emission_table_is_rejected() {
        let mut config = AppConfig::default();
        config.emissions.plane.medium_haul_max_km = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_fills_empty_values() {
        let mut config = AppConfig::default();
        config.cache.flush_every = 0;
        config.processing.concurrency = 0;
        config.logging.level.clear();
        config.apply_defaults();
        assert_eq!(config.cache.flush_every, 100);
        assert_eq!(config.processing.concurrency, 1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[geocoding]
api_key = "abc123"
language = "en"

[cache]
flush_every = 10

[transport]
plane = ["Avion"]

[emissions.car]
circuity = 1.4
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.geocoding.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.geocoding.language, "en");
        assert_eq!(config.geocoding.timeout_seconds, 30);
        assert_eq!(config.cache.flush_every, 10);
        assert_eq!(config.transport.plane, vec!["Avion".to_string()]);
        assert_eq!(config.transport.train, TransportConfig::default().train);
        assert_eq!(config.emissions.car.circuity, 1.4);
        assert_eq!(config.emissions.car.car.kg_per_km, 0.233);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = AppConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("mission_co2"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
