//! Data models for the `MissionCO2` pipeline
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geocoded places and great-circle distance
//! - Trip: Trip records from the mission source and their round-trip state
//! - Emission: Computed emission results and their per-category synthesis

pub mod emission;
pub mod location;
pub mod trip;

// Re-export all public types for convenient access
pub use emission::{
    CategoryTotals, DetailedCategory, EmissionResult, EmissionSummary, ProcessedTrip, SummaryGroup,
    TripStatus,
};
pub use location::{Location, distance_km};
pub use trip::{RoundTripFlag, TripRecord};
