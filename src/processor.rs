//! Row processing
//!
//! Drives every trip of a run through geocoding, classification and the
//! emission rules. Transport classification and round-trip correction are
//! whole-run passes; resolution and computation then run per row as an
//! ordered stream with bounded concurrency, so the output stays aligned with
//! the input.

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::config::AppConfig;
use crate::emissions::EmissionEngine;
use crate::error::EmissionsError;
use crate::geocoding::UsageSummary;
use crate::location_resolver::GeocodeResolver;
use crate::models::{
    EmissionResult, EmissionSummary, Location, ProcessedTrip, RoundTripFlag, TripRecord,
    TripStatus,
};
use crate::round_trip::correct_round_trips;
use crate::transport::{TransportCategory, TransportTaxonomy, UnknownTags};

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct ProcessingReport {
    /// One entry per input record, in input order
    pub trips: Vec<ProcessedTrip>,
    /// Transport tags found in none of the configured sets, sorted
    pub unknown_tags: Vec<String>,
    pub corrected_round_trips: usize,
    pub usage: UsageSummary,
}

impl ProcessingReport {
    /// Trips kept with zeroed values because an endpoint could not be located
    #[must_use]
    pub fn unlocated(&self) -> usize {
        self.trips
            .iter()
            .filter(|trip| !trip.result.is_located())
            .count()
    }

    #[must_use]
    pub fn total_emissions_kg(&self) -> f64 {
        self.trips.iter().map(|trip| trip.result.emissions_kg).sum()
    }

    /// Trip count, distance, emissions and uncertainty per reporting group
    #[must_use]
    pub fn summary_by_category(&self) -> EmissionSummary {
        EmissionSummary::from_trips(&self.trips)
    }
}

/// Progress of a single trip
#[derive(Debug)]
enum RowState {
    Pending,
    Located {
        departure: Location,
        arrival: Location,
    },
    Classified {
        departure: Location,
        arrival: Location,
        distance_km: f64,
        category: TransportCategory,
    },
    Computed {
        category: TransportCategory,
        result: EmissionResult,
    },
    Unlocated,
}

/// A trip with its run-level classification and round-trip flag
struct Row<'a> {
    index: usize,
    record: &'a TripRecord,
    reported: TransportCategory,
    round_trip: RoundTripFlag,
}

pub struct MissionProcessor {
    resolver: GeocodeResolver,
    taxonomy: TransportTaxonomy,
    engine: EmissionEngine,
    yes_values: Vec<String>,
    concurrency: usize,
}

impl MissionProcessor {
    pub fn new(
        resolver: GeocodeResolver,
        taxonomy: TransportTaxonomy,
        engine: EmissionEngine,
        yes_values: Vec<String>,
        concurrency: usize,
    ) -> Self {
        Self {
            resolver,
            taxonomy,
            engine,
            yes_values,
            concurrency: concurrency.max(1),
        }
    }

    /// Build a processor from the loaded configuration
    pub fn from_config(resolver: GeocodeResolver, config: &AppConfig) -> Self {
        Self::new(
            resolver,
            TransportTaxonomy::from_config(&config.transport),
            EmissionEngine::new(config.emissions.clone()),
            config.round_trip.yes_values.clone(),
            config.processing.concurrency,
        )
    }

    #[must_use]
    pub fn resolver(&self) -> &GeocodeResolver {
        &self.resolver
    }

    /// Process all records of a run.
    ///
    /// Unlocated rows are kept with zeroed values and a cache that cannot be
    /// written is only logged. Any other error aborts the run; the cache is
    /// still flushed as far as it got.
    #[instrument(name = "process_missions", skip(self, records), fields(rows = records.len()))]
    pub async fn process(&self, records: &[TripRecord]) -> Result<ProcessingReport, EmissionsError> {
        let mut unknown_tags = UnknownTags::default();
        let categories: Vec<TransportCategory> = records
            .iter()
            .map(|record| {
                let classification = self.taxonomy.classify(record.transport_tags.as_deref());
                unknown_tags.extend(classification.unknown_tags);
                classification.category
            })
            .collect();

        if !unknown_tags.is_empty() {
            warn!("Unknown transport tags: {}", unknown_tags);
        }

        let correction = correct_round_trips(records, &self.yes_values);

        let rows = records
            .iter()
            .zip(categories)
            .zip(correction.flags)
            .enumerate()
            .map(|(index, ((record, reported), round_trip))| Row {
                index,
                record,
                reported,
                round_trip,
            });

        let processed: Result<Vec<ProcessedTrip>, EmissionsError> = stream::iter(rows)
            .map(|row| self.process_row(row))
            .buffered(self.concurrency)
            .try_collect()
            .await;

        let usage = self.resolver.finish().await;
        let trips = processed?;

        let report = ProcessingReport {
            trips,
            unknown_tags: unknown_tags.into_vec(),
            corrected_round_trips: correction.corrected,
            usage,
        };

        info!(
            "Processed {} trips ({} unlocated), {:.1} kg CO2e",
            report.trips.len(),
            report.unlocated(),
            report.total_emissions_kg()
        );

        Ok(report)
    }

    async fn process_row(&self, row: Row<'_>) -> Result<ProcessedTrip, EmissionsError> {
        let mut state = RowState::Pending;

        let (main_transport, result) = loop {
            state = match state {
                RowState::Pending => match self.locate(&row).await? {
                    Some((departure, arrival)) => RowState::Located { departure, arrival },
                    None => RowState::Unlocated,
                },
                RowState::Located { departure, arrival } => {
                    let distance_km = departure.distance_km(&arrival);
                    let category = self.engine.effective_category(distance_km, row.reported);
                    RowState::Classified {
                        departure,
                        arrival,
                        distance_km,
                        category,
                    }
                }
                RowState::Classified {
                    departure,
                    arrival,
                    distance_km,
                    category,
                } => {
                    let is_round_trip = row.round_trip.is_round_trip();
                    let computation = self.engine.compute(
                        distance_km,
                        category,
                        departure.country_code.as_deref(),
                        arrival.country_code.as_deref(),
                        is_round_trip,
                    )?;
                    let trips = if is_round_trip { 2.0 } else { 1.0 };

                    RowState::Computed {
                        category,
                        result: EmissionResult {
                            one_way_distance_km: distance_km,
                            total_distance_km: distance_km * trips,
                            emissions_kg: computation.emissions_kg,
                            uncertainty_kg: computation.uncertainty_kg,
                            detailed_category: Some(computation.category),
                            departure_country_code: departure.country_code,
                            arrival_country_code: arrival.country_code,
                            status: TripStatus::Computed,
                        },
                    }
                }
                RowState::Computed { category, result } => break (Some(category), result),
                RowState::Unlocated => break (None, EmissionResult::location_not_found()),
            };
        };

        debug!(
            "Row {}: {:?} -> {:.2} kg CO2e",
            row.index, main_transport, result.emissions_kg
        );

        Ok(ProcessedTrip {
            record: row.record.clone(),
            main_transport,
            round_trip: row.round_trip,
            result,
        })
    }

    /// Resolve both endpoints. Row-level failures yield `None`.
    async fn locate(&self, row: &Row<'_>) -> Result<Option<(Location, Location)>, EmissionsError> {
        let departure_address = row.record.departure_address();
        let arrival_address = row.record.arrival_address();

        let resolved = async {
            let departure = self.resolver.resolve(&departure_address).await?;
            let arrival = self.resolver.resolve(&arrival_address).await?;
            Ok::<_, EmissionsError>((departure, arrival))
        }
        .await;

        match resolved {
            Ok(endpoints) => Ok(Some(endpoints)),
            Err(e) if e.is_row_failure() => {
                error!(
                    "Row {}: {} ({} -> {}); trip kept with zero emissions",
                    row.index, e, departure_address, arrival_address
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
