//! Mission sources and report writers
//!
//! The pipeline reads an ordered list of trips and writes back one processed
//! row per trip. The bundled implementations use JSON files.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::task;
use tracing::{debug, info};

use crate::error::EmissionsError;
use crate::models::{ProcessedTrip, TripRecord};

/// Where trip records come from
#[async_trait]
pub trait MissionSource: Send + Sync {
    /// All trips of the run, in input order
    async fn read_trips(&self) -> Result<Vec<TripRecord>, EmissionsError>;
}

/// Where processed trips go
#[async_trait]
pub trait ReportWriter: Send + Sync {
    async fn write_report(&self, trips: &[ProcessedTrip]) -> Result<(), EmissionsError>;
}

/// Reads a JSON array of trip records
#[derive(Debug, Clone)]
pub struct JsonMissionSource {
    path: PathBuf,
}

impl JsonMissionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MissionSource for JsonMissionSource {
    #[tracing::instrument(name = "read_missions", skip(self), fields(path = %self.path.display()))]
    async fn read_trips(&self) -> Result<Vec<TripRecord>, EmissionsError> {
        let path = self.path.clone();
        let content = task::spawn_blocking(move || fs::read_to_string(path))
            .await
            .map_err(std::io::Error::other)??;

        let trips: Vec<TripRecord> = serde_json::from_str(&content)?;
        info!("Read {} trips from {}", trips.len(), self.path.display());
        Ok(trips)
    }
}

/// Writes processed trips as a pretty-printed JSON array
#[derive(Debug, Clone)]
pub struct JsonReportWriter {
    path: PathBuf,
}

impl JsonReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportWriter for JsonReportWriter {
    #[tracing::instrument(name = "write_report", skip(self, trips), fields(path = %self.path.display()))]
    async fn write_report(&self, trips: &[ProcessedTrip]) -> Result<(), EmissionsError> {
        let bytes = serde_json::to_vec_pretty(trips)?;
        let path = self.path.clone();

        task::spawn_blocking(move || -> Result<(), EmissionsError> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, bytes)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;

        debug!("Wrote {} processed trips", trips.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmissionResult, RoundTripFlag};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_partial_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missions.json");
        fs::write(
            &path,
            r#"[
                {"mission_id": "M1", "departure_city": "Paris", "departure_country": "France",
                 "arrival_city": "Lyon", "transport_tags": "Train", "round_trip_flag": "oui"},
                {"arrival_city": "Rome"}
            ]"#,
        )
        .unwrap();

        let trips = JsonMissionSource::new(&path).read_trips().await.unwrap();
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].departure_address(), "Paris (France)");
        assert_eq!(trips[1].departure_city, None);
        assert_eq!(trips[1].round_trip_flag, "");
    }

    #[tokio::test]
    async fn test_reads_numeric_mission_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missions.json");
        fs::write(
            &path,
            r#"[{"mission_id": 42, "departure_city": "Paris", "arrival_city": "Lyon",
                 "departure_date": "2024-03-05", "credits": 1203, "round_trip_flag": "non"}]"#,
        )
        .unwrap();

        let trips = JsonMissionSource::new(&path).read_trips().await.unwrap();
        assert_eq!(trips[0].mission_key(), Some("42"));
        assert_eq!(trips[0].credits.as_deref(), Some("1203"));
    }

    #[tokio::test]
    async fn test_missing_source_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = JsonMissionSource::new(dir.path().join("absent.json"))
            .read_trips()
            .await
            .unwrap_err();
        assert!(matches!(err, EmissionsError::Io { .. }));
    }

    #[tokio::test]
    async fn test_malformed_source_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missions.json");
        fs::write(&path, "{\"not\": \"an array\"}").unwrap();

        let err = JsonMissionSource::new(&path).read_trips().await.unwrap_err();
        assert!(matches!(err, EmissionsError::Serialization { .. }));
    }

    #[tokio::test]
    async fn test_report_is_flat_json() {
        let dir = TempDir::new().unwrap();
        let writer = JsonReportWriter::new(dir.path().join("out").join("report.json"));
        let trip = ProcessedTrip {
            record: TripRecord {
                mission_id: Some("M1".into()),
                arrival_city: Some("Rome".into()),
                ..Default::default()
            },
            main_transport: None,
            round_trip: RoundTripFlag::No,
            result: EmissionResult::location_not_found(),
        };

        writer.write_report(&[trip]).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(writer.path()).unwrap()).unwrap();
        assert_eq!(written[0]["mission_id"], "M1");
        assert_eq!(written[0]["status"], "location_not_found");
        assert_eq!(written[0]["emissions_kg"], 0.0);
        assert_eq!(written[0]["round_trip"], "no");
    }
}
