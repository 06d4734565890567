//! Trip records as read from the mission source

use serde::{Deserialize, Deserializer, Serialize};

/// One leg of a mission, read-only input to the pipeline
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct TripRecord {
    /// Identifier shared by the legs of a mission
    #[serde(default, deserialize_with = "text_or_number")]
    pub mission_id: Option<String>,
    /// Passed through to the report as given
    #[serde(default, deserialize_with = "text_or_number")]
    pub departure_date: Option<String>,
    #[serde(default)]
    pub departure_city: Option<String>,
    #[serde(default)]
    pub departure_country: Option<String>,
    #[serde(default)]
    pub arrival_city: Option<String>,
    #[serde(default)]
    pub arrival_country: Option<String>,
    /// Free-text list of transport modes, e.g. "Train, Métro"
    #[serde(default)]
    pub transport_tags: Option<String>,
    /// Raw round-trip column value, e.g. "oui" / "non"
    #[serde(default)]
    pub round_trip_flag: String,
    /// Budget line the trip is charged to, passed through to the report
    #[serde(default, deserialize_with = "text_or_number")]
    pub credits: Option<String>,
}

/// Spreadsheet exports write identifiers as numbers or strings
#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<TextOrNumber>::deserialize(deserializer)?.map(|value| match value {
            TextOrNumber::Text(text) => text,
            TextOrNumber::Integer(n) => n.to_string(),
            // 42.0 from a numeric cell is the id 42
            TextOrNumber::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{f:.0}")
            }
            TextOrNumber::Float(f) => f.to_string(),
        }),
    )
}

impl TripRecord {
    /// Address used to geocode the departure
    #[must_use]
    pub fn departure_address(&self) -> String {
        format_address(
            self.departure_city.as_deref(),
            self.departure_country.as_deref(),
        )
    }

    /// Address used to geocode the arrival
    #[must_use]
    pub fn arrival_address(&self) -> String {
        format_address(self.arrival_city.as_deref(), self.arrival_country.as_deref())
    }

    /// Mission identifier, ignoring blank values
    #[must_use]
    pub fn mission_key(&self) -> Option<&str> {
        self.mission_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// `"<city> (<country>)"` when a country is given, else `"<city>"`.
///
/// A missing city still produces `" (<country>)"`, which the resolver
/// recognizes as a missing place.
#[must_use]
pub fn format_address(city: Option<&str>, country: Option<&str>) -> String {
    let city = city.map(str::trim).unwrap_or_default();
    match country.map(str::trim).filter(|c| !c.is_empty()) {
        Some(country) => format!("{city} ({country})"),
        None => city.to_string(),
    }
}

/// Round-trip state of a trip
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundTripFlag {
    Yes,
    No,
    /// Flagged round trip by the source, reset to one-way because the
    /// mission has several legs
    Corrected,
}

impl RoundTripFlag {
    /// Parse the raw column value against the accepted "yes" spellings
    #[must_use]
    pub fn parse<S: AsRef<str>>(raw: &str, yes_values: &[S]) -> Self {
        let raw = raw.trim();
        if yes_values
            .iter()
            .any(|yes| yes.as_ref().trim().eq_ignore_ascii_case(raw))
        {
            Self::Yes
        } else {
            Self::No
        }
    }

    #[must_use]
    pub fn is_round_trip(self) -> bool {
        self == Self::Yes
    }
}
