//! Emission computation
//!
//! - Factor table: immutable kgCO2e/km factors, uncertainty ratios and
//!   distance corrections, loaded from configuration
//! - Engine: the tiered, country-aware rules applied per trip

pub mod engine;
pub mod factors;

pub use engine::{Computation, EmissionEngine};
pub use factors::{CarFactors, EmissionFactorTable, Factor, FallbackRules, PlaneFactors, TrainFactors};
