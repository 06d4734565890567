//! Error types and handling for `MissionCO2`

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the emission pipeline
#[derive(Error, Debug)]
pub enum EmissionsError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The geocoding provider has no match for an address
    #[error("Location not found: <{address}>")]
    LocationNotFound { address: String },

    /// Geocoding provider communication errors
    #[error("Geocoding error: {message}")]
    Geocoding { message: String },

    /// A transport category the rule engine has no factors for
    #[error("Invalid transport category: {category}")]
    InvalidCategory { category: String },

    /// The persisted location cache exists but cannot be read back
    #[error("Corrupt location cache at {}: {source}", path.display())]
    CacheCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Mission source / report (de)serialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl EmissionsError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new location-not-found error
    pub fn location_not_found<S: Into<String>>(address: S) -> Self {
        Self::LocationNotFound {
            address: address.into(),
        }
    }

    /// Create a new geocoding error
    pub fn geocoding<S: Into<String>>(message: S) -> Self {
        Self::Geocoding {
            message: message.into(),
        }
    }

    /// Create a new invalid-category error
    pub fn invalid_category<S: Into<String>>(category: S) -> Self {
        Self::InvalidCategory {
            category: category.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Whether the error only affects the row being resolved
    #[must_use]
    pub fn is_row_failure(&self) -> bool {
        matches!(
            self,
            EmissionsError::LocationNotFound { .. } | EmissionsError::Geocoding { .. }
        )
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            EmissionsError::Config { message } => {
                format!("Configuration error: {message}. Please check your config file and API key.")
            }
            EmissionsError::LocationNotFound { address } => {
                format!("Could not locate <{address}>.")
            }
            EmissionsError::Geocoding { .. } => {
                "Unable to reach the geocoding service. Please check your internet connection."
                    .to_string()
            }
            EmissionsError::InvalidCategory { category } => {
                format!("Internal error: no emission factors for transport category '{category}'.")
            }
            EmissionsError::CacheCorrupt { path, .. } => format!(
                "The location cache {} is unreadable. Repair or move it before running again.",
                path.display()
            ),
            EmissionsError::Cache { .. } => {
                "Cache operation failed. Please check the cache file permissions.".to_string()
            }
            EmissionsError::Serialization { source } => {
                format!("Invalid mission or report data: {source}")
            }
            EmissionsError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = EmissionsError::config("missing API key");
        assert!(matches!(config_err, EmissionsError::Config { .. }));

        let not_found = EmissionsError::location_not_found("Atlantis");
        assert!(matches!(not_found, EmissionsError::LocationNotFound { .. }));
        assert_eq!(not_found.to_string(), "Location not found: <Atlantis>");

        let invalid = EmissionsError::invalid_category("unknown");
        assert!(matches!(invalid, EmissionsError::InvalidCategory { .. }));
    }

    #[test]
    fn test_row_failures() {
        assert!(EmissionsError::location_not_found("x").is_row_failure());
        assert!(EmissionsError::geocoding("timeout").is_row_failure());
        assert!(!EmissionsError::invalid_category("unknown").is_row_failure());
        assert!(!EmissionsError::cache("disk full").is_row_failure());
    }

    #[test]
    fn test_user_messages() {
        let config_err = EmissionsError::config("test");
        assert!(config_err.user_message().contains("Configuration error"));

        let api_err = EmissionsError::geocoding("test");
        assert!(api_err.user_message().contains("Unable to reach"));

        let not_found = EmissionsError::location_not_found("Nowhere (FR)");
        assert!(not_found.user_message().contains("Nowhere (FR)"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EmissionsError = io_err.into();
        assert!(matches!(err, EmissionsError::Io { .. }));
    }
}
