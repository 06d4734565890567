//! Emission factor table
//!
//! Every factor is in kgCO2e per corrected kilometer. Uncertainty ratios are
//! relative to the computed emissions (0.7 means ±70%).

use serde::{Deserialize, Serialize};

use crate::error::EmissionsError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub kg_per_km: f64,
    pub uncertainty_ratio: f64,
}

impl Factor {
    #[must_use]
    pub const fn new(kg_per_km: f64, uncertainty_ratio: f64) -> Self {
        Self {
            kg_per_km,
            uncertainty_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneFactors {
    /// Added to the geodesic distance for detours, taxiing and climb
    pub offset_km: f64,
    /// One-way geodesic distances below this are short-haul
    pub short_haul_max_km: f64,
    /// One-way geodesic distances below this (and not short) are medium-haul
    pub medium_haul_max_km: f64,
    pub short_haul: Factor,
    pub medium_haul: Factor,
    pub long_haul: Factor,
}

impl Default for PlaneFactors {
    fn default() -> Self {
        Self {
            offset_km: 95.0,
            short_haul_max_km: 1000.0,
            medium_haul_max_km: 3500.0,
            short_haul: Factor::new(0.258, 0.7),
            medium_haul: Factor::new(0.187, 0.7),
            long_haul: Factor::new(0.152, 0.7),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainFactors {
    /// Route circuity multiplier applied to the geodesic distance
    pub circuity: f64,
    /// Country whose rail network gets dedicated factors
    pub domestic_country: String,
    /// Domestic corrected distances below this use the regional factor
    pub regional_max_km: f64,
    pub domestic_regional: Factor,
    pub domestic: Factor,
    /// Exactly one endpoint in the domestic country
    pub half_domestic: Factor,
    pub european: Factor,
}

impl Default for TrainFactors {
    fn default() -> Self {
        Self {
            circuity: 1.2,
            domestic_country: "FR".to_string(),
            regional_max_km: 200.0,
            domestic_regional: Factor::new(0.018, 0.6),
            domestic: Factor::new(0.003, 0.2),
            half_domestic: Factor::new(0.016, 0.2),
            european: Factor::new(0.037, 0.2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarFactors {
    pub circuity: f64,
    pub car: Factor,
}

impl Default for CarFactors {
    fn default() -> Self {
        Self {
            circuity: 1.3,
            car: Factor::new(0.233, 0.6),
        }
    }
}

/// Rules applied to the classified category before computing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackRules {
    /// Undocumented trips shorter than this are assumed to be by train,
    /// longer ones by plane
    pub unknown_train_max_km: f64,
    /// Trips longer than this are computed as flights whatever was reported
    pub force_plane_min_km: f64,
}

impl Default for FallbackRules {
    fn default() -> Self {
        Self {
            unknown_train_max_km: 700.0,
            force_plane_min_km: 4000.0,
        }
    }
}

/// Immutable factor table handed to the rule engine
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionFactorTable {
    pub plane: PlaneFactors,
    pub train: TrainFactors,
    pub car: CarFactors,
    pub fallback: FallbackRules,
}

impl EmissionFactorTable {
    /// Reject tables that could produce negative or ill-tiered results
    pub fn validate(&self) -> Result<(), EmissionsError> {
        let factors = [
            ("plane.short_haul", self.plane.short_haul),
            ("plane.medium_haul", self.plane.medium_haul),
            ("plane.long_haul", self.plane.long_haul),
            ("train.domestic_regional", self.train.domestic_regional),
            ("train.domestic", self.train.domestic),
            ("train.half_domestic", self.train.half_domestic),
            ("train.european", self.train.european),
            ("car.car", self.car.car),
        ];
        for (name, factor) in factors {
            if !(factor.kg_per_km >= 0.0 && factor.uncertainty_ratio >= 0.0) {
                return Err(EmissionsError::config(format!(
                    "Emission factor {name} must be non-negative"
                )));
            }
        }

        let corrections = [
            ("plane.offset_km", self.plane.offset_km),
            ("train.circuity", self.train.circuity),
            ("car.circuity", self.car.circuity),
        ];
        for (name, value) in corrections {
            if !(value >= 0.0) {
                return Err(EmissionsError::config(format!(
                    "Distance correction {name} must be non-negative"
                )));
            }
        }

        if self.plane.short_haul_max_km >= self.plane.medium_haul_max_km {
            return Err(EmissionsError::config(
                "plane.short_haul_max_km must be below plane.medium_haul_max_km",
            ));
        }

        if self.train.domestic_country.trim().is_empty() {
            return Err(EmissionsError::config("train.domestic_country cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        assert!(EmissionFactorTable::default().validate().is_ok());
    }

    #[test]
    fn test_negative_factor_rejected() {
        let mut table = EmissionFactorTable::default();
        table.car.car.kg_per_km = -0.1;
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("car.car"));
    }

    #[test]
    fn test_nan_ratio_rejected() {
        let mut table = EmissionFactorTable::default();
        table.train.european.uncertainty_ratio = f64::NAN;
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_inverted_plane_tiers_rejected() {
        let mut table = EmissionFactorTable::default();
        table.plane.short_haul_max_km = 4000.0;
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let table: EmissionFactorTable =
            serde_json::from_str(r#"{"car": {"circuity": 1.5}}"#).unwrap();
        assert_eq!(table.car.circuity, 1.5);
        assert_eq!(table.car.car, Factor::new(0.233, 0.6));
        assert_eq!(table.plane, PlaneFactors::default());
    }
}
