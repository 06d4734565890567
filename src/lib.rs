//! `MissionCO2` - greenhouse-gas footprint of business trips
//!
//! This library geocodes the endpoints of each trip, classifies the
//! transport mode and applies emission factors per mode and distance band,
//! keeping a persistent cache of resolved locations across runs.

pub mod cache;
pub mod config;
pub mod emissions;
pub mod error;
pub mod geocoding;
pub mod io;
pub mod location_resolver;
pub mod models;
pub mod processor;
pub mod round_trip;
pub mod telemetry;
pub mod transport;

// Re-export core types for public API
pub use cache::{FlushPolicy, LocationStore};
pub use config::AppConfig;
pub use emissions::{EmissionEngine, EmissionFactorTable};
pub use error::EmissionsError;
pub use geocoding::{GeocodingProvider, OpenCageClient, UsageSummary};
pub use io::{JsonMissionSource, JsonReportWriter, MissionSource, ReportWriter};
pub use location_resolver::GeocodeResolver;
pub use models::{
    EmissionResult, EmissionSummary, Location, ProcessedTrip, RoundTripFlag, TripRecord, distance_km,
};
pub use processor::{MissionProcessor, ProcessingReport};
pub use round_trip::correct_round_trips;
pub use transport::{TransportCategory, TransportTaxonomy};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, EmissionsError>;
