//! Emission rule engine
//!
//! Turns a one-way geodesic distance, a transport category and the two
//! endpoints' countries into emissions, uncertainty and the sub-category
//! whose factor was used.

use tracing::debug;

use super::factors::{EmissionFactorTable, Factor};
use crate::error::EmissionsError;
use crate::models::DetailedCategory;
use crate::transport::TransportCategory;

/// Result of one rule evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Computation {
    /// Detour-corrected distance, doubled for round trips
    pub corrected_distance_km: f64,
    pub emissions_kg: f64,
    pub uncertainty_kg: f64,
    pub category: DetailedCategory,
}

#[derive(Debug, Clone)]
pub struct EmissionEngine {
    table: EmissionFactorTable,
}

impl EmissionEngine {
    #[must_use]
    pub fn new(table: EmissionFactorTable) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn table(&self) -> &EmissionFactorTable {
        &self.table
    }

    /// Category actually used for a trip of `distance_km`.
    ///
    /// `Unknown` becomes train for short trips and plane otherwise; any trip
    /// beyond the force-plane threshold is a flight regardless of the
    /// reported mode.
    #[must_use]
    pub fn effective_category(
        &self,
        distance_km: f64,
        category: TransportCategory,
    ) -> TransportCategory {
        let fallback = &self.table.fallback;
        let category = match category {
            TransportCategory::Unknown if distance_km < fallback.unknown_train_max_km => {
                TransportCategory::Train
            }
            TransportCategory::Unknown => TransportCategory::Plane,
            known => known,
        };

        if distance_km > fallback.force_plane_min_km {
            TransportCategory::Plane
        } else {
            category
        }
    }

    /// Compute emissions for an already-resolved category.
    ///
    /// Country codes are the endpoints' ISO alpha-2 codes, when known.
    /// `TransportCategory::Unknown` is rejected: callers resolve it with
    /// [`Self::effective_category`] first.
    pub fn compute(
        &self,
        distance_km: f64,
        category: TransportCategory,
        departure_country: Option<&str>,
        arrival_country: Option<&str>,
        is_round_trip: bool,
    ) -> Result<Computation, EmissionsError> {
        let (mut corrected_distance_km, factor, detailed) = match category {
            TransportCategory::Plane => self.plane(distance_km),
            TransportCategory::Train => self.train(distance_km, departure_country, arrival_country),
            TransportCategory::Car => self.car(distance_km),
            TransportCategory::Unknown => {
                return Err(EmissionsError::invalid_category(category.as_str()));
            }
        };

        if is_round_trip {
            corrected_distance_km *= 2.0;
        }

        let emissions_kg = corrected_distance_km * factor.kg_per_km;
        let uncertainty_kg = emissions_kg * factor.uncertainty_ratio;

        debug!(
            "{:.1} km by {} -> {:.1} corrected km, {:.2} kg CO2e (±{:.2})",
            distance_km, detailed, corrected_distance_km, emissions_kg, uncertainty_kg
        );

        Ok(Computation {
            corrected_distance_km,
            emissions_kg,
            uncertainty_kg,
            category: detailed,
        })
    }

    fn plane(&self, distance_km: f64) -> (f64, Factor, DetailedCategory) {
        let plane = &self.table.plane;
        let corrected = distance_km + plane.offset_km;
        if distance_km < plane.short_haul_max_km {
            (corrected, plane.short_haul, DetailedCategory::PlaneShort)
        } else if distance_km < plane.medium_haul_max_km {
            (corrected, plane.medium_haul, DetailedCategory::PlaneMedium)
        } else {
            (corrected, plane.long_haul, DetailedCategory::PlaneLong)
        }
    }

    fn train(
        &self,
        distance_km: f64,
        departure_country: Option<&str>,
        arrival_country: Option<&str>,
    ) -> (f64, Factor, DetailedCategory) {
        let train = &self.table.train;
        let corrected = distance_km * train.circuity;
        let domestic = |code: Option<&str>| {
            code.is_some_and(|code| code.eq_ignore_ascii_case(&train.domestic_country))
        };

        match (domestic(departure_country), domestic(arrival_country)) {
            (true, true) if corrected < train.regional_max_km => (
                corrected,
                train.domestic_regional,
                DetailedCategory::TrainRegionalFr,
            ),
            (true, true) => (corrected, train.domestic, DetailedCategory::TrainFr),
            (true, false) | (false, true) => {
                (corrected, train.half_domestic, DetailedCategory::TrainHalfFr)
            }
            (false, false) => (corrected, train.european, DetailedCategory::TrainEu),
        }
    }

    fn car(&self, distance_km: f64) -> (f64, Factor, DetailedCategory) {
        let car = &self.table.car;
        (distance_km * car.circuity, car.car, DetailedCategory::Car)
    }
}

impl Default for EmissionEngine {
    fn default() -> Self {
        Self::new(EmissionFactorTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const EPS: f64 = 1e-9;

    fn engine() -> EmissionEngine {
        EmissionEngine::default()
    }

    fn compute(
        distance_km: f64,
        category: TransportCategory,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Computation {
        engine()
            .compute(distance_km, category, from, to, false)
            .unwrap()
    }

    #[test]
    fn test_plane_tier_boundaries() {
        let short = compute(999.0, TransportCategory::Plane, None, None);
        assert_eq!(short.category, DetailedCategory::PlaneShort);
        assert!((short.corrected_distance_km - 1094.0).abs() < EPS);
        assert!((short.emissions_kg - 1094.0 * 0.258).abs() < EPS);

        let medium = compute(1000.0, TransportCategory::Plane, None, None);
        assert_eq!(medium.category, DetailedCategory::PlaneMedium);
        assert!((medium.emissions_kg - 1095.0 * 0.187).abs() < EPS);

        let still_medium = compute(3499.9, TransportCategory::Plane, None, None);
        assert_eq!(still_medium.category, DetailedCategory::PlaneMedium);

        let long = compute(3500.0, TransportCategory::Plane, None, None);
        assert_eq!(long.category, DetailedCategory::PlaneLong);
        assert!((long.emissions_kg - 3595.0 * 0.152).abs() < EPS);
        assert!((long.uncertainty_kg - long.emissions_kg * 0.7).abs() < EPS);
    }

    #[rstest]
    #[case(393.0, Some("FR"), Some("FR"), DetailedCategory::TrainFr, 0.003, 0.2)]
    #[case(150.0, Some("FR"), Some("FR"), DetailedCategory::TrainRegionalFr, 0.018, 0.6)]
    #[case(500.0, Some("FR"), Some("DE"), DetailedCategory::TrainHalfFr, 0.016, 0.2)]
    #[case(500.0, None, Some("FR"), DetailedCategory::TrainHalfFr, 0.016, 0.2)]
    #[case(500.0, Some("DE"), Some("IT"), DetailedCategory::TrainEu, 0.037, 0.2)]
    #[case(500.0, None, None, DetailedCategory::TrainEu, 0.037, 0.2)]
    fn test_train_country_rules(
        #[case] distance: f64,
        #[case] from: Option<&str>,
        #[case] to: Option<&str>,
        #[case] expected: DetailedCategory,
        #[case] factor: f64,
        #[case] ratio: f64,
    ) {
        let result = compute(distance, TransportCategory::Train, from, to);
        let corrected = distance * 1.2;
        assert_eq!(result.category, expected);
        assert!((result.emissions_kg - corrected * factor).abs() < EPS);
        assert!((result.uncertainty_kg - corrected * factor * ratio).abs() < EPS);
    }

    #[test]
    fn test_regional_threshold_uses_corrected_distance() {
        // 170 km geodesic is 204 km on rails: no longer regional
        let result = compute(170.0, TransportCategory::Train, Some("FR"), Some("FR"));
        assert_eq!(result.category, DetailedCategory::TrainFr);

        let result = compute(166.0, TransportCategory::Train, Some("FR"), Some("FR"));
        assert_eq!(result.category, DetailedCategory::TrainRegionalFr);
    }

    #[test]
    fn test_paris_lyon_train() {
        let result = compute(393.0, TransportCategory::Train, Some("FR"), Some("FR"));
        assert!((result.corrected_distance_km - 471.6).abs() < 1e-6);
        assert!((result.emissions_kg - 1.4148).abs() < 1e-6);
        assert!((result.uncertainty_kg - 0.28296).abs() < 1e-6);
        assert_eq!(result.category.label(), "train (FR)");
    }

    #[test]
    fn test_car() {
        let result = compute(100.0, TransportCategory::Car, Some("FR"), Some("FR"));
        assert_eq!(result.category, DetailedCategory::Car);
        assert!((result.corrected_distance_km - 130.0).abs() < EPS);
        assert!((result.emissions_kg - 130.0 * 0.233).abs() < EPS);
        assert!((result.uncertainty_kg - 130.0 * 0.233 * 0.6).abs() < EPS);
    }

    #[rstest]
    #[case(TransportCategory::Plane, 250.0, None, None)]
    #[case(TransportCategory::Plane, 2000.0, Some("FR"), Some("US"))]
    #[case(TransportCategory::Plane, 9000.0, None, None)]
    #[case(TransportCategory::Train, 120.0, Some("FR"), Some("FR"))]
    #[case(TransportCategory::Train, 800.0, Some("FR"), Some("FR"))]
    #[case(TransportCategory::Train, 800.0, Some("FR"), Some("CH"))]
    #[case(TransportCategory::Train, 800.0, Some("ES"), Some("CH"))]
    #[case(TransportCategory::Car, 321.7, None, None)]
    fn test_round_trip_is_exactly_double(
        #[case] category: TransportCategory,
        #[case] distance: f64,
        #[case] from: Option<&str>,
        #[case] to: Option<&str>,
    ) {
        let engine = engine();
        let one_way = engine.compute(distance, category, from, to, false).unwrap();
        let round = engine.compute(distance, category, from, to, true).unwrap();
        assert_eq!(round.corrected_distance_km, 2.0 * one_way.corrected_distance_km);
        assert_eq!(round.emissions_kg, 2.0 * one_way.emissions_kg);
        assert_eq!(round.uncertainty_kg, 2.0 * one_way.uncertainty_kg);
        assert_eq!(round.category, one_way.category);
    }

    #[test]
    fn test_unknown_category_is_invalid() {
        let err = engine()
            .compute(100.0, TransportCategory::Unknown, None, None, false)
            .unwrap_err();
        assert!(matches!(err, EmissionsError::InvalidCategory { .. }));
    }

    #[rstest]
    #[case(TransportCategory::Unknown, 699.0, TransportCategory::Train)]
    #[case(TransportCategory::Unknown, 700.0, TransportCategory::Plane)]
    #[case(TransportCategory::Car, 4000.0, TransportCategory::Car)]
    #[case(TransportCategory::Car, 4000.5, TransportCategory::Plane)]
    #[case(TransportCategory::Train, 6000.0, TransportCategory::Plane)]
    #[case(TransportCategory::Plane, 10.0, TransportCategory::Plane)]
    fn test_effective_category(
        #[case] classified: TransportCategory,
        #[case] distance: f64,
        #[case] expected: TransportCategory,
    ) {
        assert_eq!(engine().effective_category(distance, classified), expected);
    }

    #[test]
    fn test_results_are_non_negative() {
        let engine = engine();
        for category in [
            TransportCategory::Plane,
            TransportCategory::Train,
            TransportCategory::Car,
        ] {
            let result = engine.compute(0.0, category, None, None, true).unwrap();
            assert!(result.emissions_kg >= 0.0);
            assert!(result.uncertainty_kg >= 0.0);
        }
    }
}
