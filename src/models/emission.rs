//! Computed emission results

use std::fmt;

use serde::{Deserialize, Serialize};

use super::trip::{RoundTripFlag, TripRecord};
use crate::transport::TransportCategory;

/// Sub-category whose emission factor was applied
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailedCategory {
    #[serde(rename = "plane (short)")]
    PlaneShort,
    #[serde(rename = "plane (med)")]
    PlaneMedium,
    #[serde(rename = "plane (long)")]
    PlaneLong,
    #[serde(rename = "train (TER, FR)")]
    TrainRegionalFr,
    #[serde(rename = "train (FR)")]
    TrainFr,
    #[serde(rename = "train (half-FR)")]
    TrainHalfFr,
    #[serde(rename = "train (EU)")]
    TrainEu,
    #[serde(rename = "car")]
    Car,
}

impl DetailedCategory {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::PlaneShort => "plane (short)",
            Self::PlaneMedium => "plane (med)",
            Self::PlaneLong => "plane (long)",
            Self::TrainRegionalFr => "train (TER, FR)",
            Self::TrainFr => "train (FR)",
            Self::TrainHalfFr => "train (half-FR)",
            Self::TrainEu => "train (EU)",
            Self::Car => "car",
        }
    }
}

impl fmt::Display for DetailedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Computed,
    /// One of the endpoints could not be geocoded; values are zeroed and
    /// the row needs a manual follow-up
    LocationNotFound,
}

/// Emission figures for one trip
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EmissionResult {
    pub one_way_distance_km: f64,
    /// One-way distance, doubled for round trips
    pub total_distance_km: f64,
    /// kgCO2e
    pub emissions_kg: f64,
    /// kgCO2e, absolute bound around `emissions_kg`
    pub uncertainty_kg: f64,
    pub detailed_category: Option<DetailedCategory>,
    pub departure_country_code: Option<String>,
    pub arrival_country_code: Option<String>,
    pub status: TripStatus,
}

impl EmissionResult {
    /// Zero-impact result for a trip whose endpoints could not be located
    #[must_use]
    pub fn location_not_found() -> Self {
        Self {
            one_way_distance_km: 0.0,
            total_distance_km: 0.0,
            emissions_kg: 0.0,
            uncertainty_kg: 0.0,
            detailed_category: None,
            departure_country_code: None,
            arrival_country_code: None,
            status: TripStatus::LocationNotFound,
        }
    }

    #[must_use]
    pub fn is_located(&self) -> bool {
        self.status == TripStatus::Computed
    }
}

/// A trip record enriched with its computed emissions
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProcessedTrip {
    #[serde(flatten)]
    pub record: TripRecord,
    /// Category the emissions were computed with, after fallbacks. Absent
    /// for unlocated trips.
    pub main_transport: Option<TransportCategory>,
    pub round_trip: RoundTripFlag,
    #[serde(flatten)]
    pub result: EmissionResult,
}

/// Rows of the per-category synthesis. Train sub-categories share one row.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SummaryGroup {
    Car,
    Train,
    PlaneShort,
    PlaneMedium,
    PlaneLong,
}

impl SummaryGroup {
    pub const ALL: [SummaryGroup; 5] = [
        Self::Car,
        Self::Train,
        Self::PlaneShort,
        Self::PlaneMedium,
        Self::PlaneLong,
    ];

    #[must_use]
    pub fn of(category: DetailedCategory) -> Self {
        match category {
            DetailedCategory::Car => Self::Car,
            DetailedCategory::TrainRegionalFr
            | DetailedCategory::TrainFr
            | DetailedCategory::TrainHalfFr
            | DetailedCategory::TrainEu => Self::Train,
            DetailedCategory::PlaneShort => Self::PlaneShort,
            DetailedCategory::PlaneMedium => Self::PlaneMedium,
            DetailedCategory::PlaneLong => Self::PlaneLong,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Car => "car",
            Self::Train => "train *",
            Self::PlaneShort => "plane (short)",
            Self::PlaneMedium => "plane (med)",
            Self::PlaneLong => "plane (long)",
        }
    }
}

impl fmt::Display for SummaryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregated figures for a set of trips
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct CategoryTotals {
    pub trips: usize,
    /// Sum of total (round-trip aware) distances
    pub distance_km: f64,
    pub emissions_kg: f64,
    pub uncertainty_kg: f64,
}

impl CategoryTotals {
    fn add(&mut self, result: &EmissionResult) {
        self.trips += 1;
        self.distance_km += result.total_distance_km;
        self.emissions_kg += result.emissions_kg;
        self.uncertainty_kg += result.uncertainty_kg;
    }
}

/// Per-group synthesis of a run. Unlocated trips are left out.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EmissionSummary {
    /// One entry per [`SummaryGroup`], in [`SummaryGroup::ALL`] order
    pub groups: Vec<(SummaryGroup, CategoryTotals)>,
    pub total: CategoryTotals,
}

impl EmissionSummary {
    #[must_use]
    pub fn from_trips(trips: &[ProcessedTrip]) -> Self {
        let mut groups: Vec<(SummaryGroup, CategoryTotals)> = SummaryGroup::ALL
            .iter()
            .map(|group| (*group, CategoryTotals::default()))
            .collect();
        let mut total = CategoryTotals::default();

        for result in trips.iter().map(|trip| &trip.result) {
            let Some(category) = result.detailed_category else {
                continue;
            };
            let group = SummaryGroup::of(category);
            if let Some((_, totals)) = groups.iter_mut().find(|(g, _)| *g == group) {
                totals.add(result);
            }
            total.add(result);
        }

        Self { groups, total }
    }

    /// Totals of one group
    #[must_use]
    pub fn group(&self, group: SummaryGroup) -> CategoryTotals {
        self.groups
            .iter()
            .find(|(g, _)| *g == group)
            .map(|(_, totals)| *totals)
            .unwrap_or_default()
    }
}
