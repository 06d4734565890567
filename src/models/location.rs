//! Location model for geocoded places and the distance between them

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A geocoded place
///
/// Field names match the persisted cache document, so `country_code` is
/// stored as `countryCode`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Address as formatted by the geocoding provider
    pub address: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Country code (ISO 3166-1 alpha-2)
    #[serde(rename = "countryCode", default)]
    pub country_code: Option<String>,
}

impl Location {
    /// Create location with country
    #[must_use]
    pub fn with_country(
        address: impl Into<String>,
        latitude: f64,
        longitude: f64,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            latitude,
            longitude,
            country_code: Some(country_code.into()),
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Great-circle distance to another location in kilometers
    #[must_use]
    pub fn distance_km(&self, other: &Location) -> f64 {
        distance_km(self, other)
    }

    fn coordinate_order(&self, other: &Location) -> Ordering {
        self.latitude
            .total_cmp(&other.latitude)
            .then(self.longitude.total_cmp(&other.longitude))
    }
}

/// Great-circle distance between two locations in kilometers.
///
/// Endpoints are ordered by coordinates first so the result does not depend
/// on argument order down to the last bit.
#[must_use]
pub fn distance_km(a: &Location, b: &Location) -> f64 {
    let (from, to) = match a.coordinate_order(b) {
        Ordering::Greater => (b, a),
        _ => (a, b),
    };

    haversine::distance(
        haversine::Location {
            latitude: from.latitude,
            longitude: from.longitude,
        },
        haversine::Location {
            latitude: to.latitude,
            longitude: to.longitude,
        },
        haversine::Units::Kilometers,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paris() -> Location {
        Location::with_country("Paris, France", 48.8566, 2.3522, "FR")
    }

    fn lyon() -> Location {
        Location::with_country("Lyon, France", 45.7640, 4.8357, "FR")
    }

    #[test]
    fn test_distance_is_symmetric() {
        let tokyo = Location::with_country("Tokyo, Japan", 35.6762, 139.6503, "JP");
        assert_eq!(distance_km(&paris(), &lyon()), distance_km(&lyon(), &paris()));
        assert_eq!(distance_km(&paris(), &tokyo), distance_km(&tokyo, &paris()));
        assert_eq!(paris().distance_km(&tokyo), tokyo.distance_km(&paris()));
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance_km(&paris(), &paris()), 0.0);
    }

    #[test]
    fn test_paris_lyon_distance() {
        let d = distance_km(&paris(), &lyon());
        assert!((d - 392.0).abs() < 5.0, "unexpected distance {d}");
    }

    #[test]
    fn test_cache_document_field_names() {
        let json = serde_json::to_value(paris()).unwrap();
        assert_eq!(json["countryCode"], "FR");

        let legacy = r#"{"address": "Bern", "latitude": 46.95, "longitude": 7.44}"#;
        let location: Location = serde_json::from_str(legacy).unwrap();
        assert_eq!(location.country_code, None);
        assert_eq!(location.format_coordinates(), "46.9500, 7.4400");
    }
}
