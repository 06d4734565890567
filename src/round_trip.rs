//! Round-trip correction
//!
//! A mission split into several one-way legs is sometimes flagged as a round
//! trip on every leg by the source. Counting each leg twice would double the
//! mission's distance, so legs sharing a mission id are forced to one-way.

use std::collections::HashMap;

use tracing::info;

use crate::models::{RoundTripFlag, TripRecord};

/// Round-trip flags aligned with the input records
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTripCorrection {
    pub flags: Vec<RoundTripFlag>,
    /// Number of rows whose flag was reset to one-way
    pub corrected: usize,
}

/// Parse every record's flag and reset round trips on multi-leg missions.
///
/// Rows with a missing, blank or unique mission id are left as parsed.
#[must_use]
pub fn correct_round_trips<S: AsRef<str>>(
    records: &[TripRecord],
    yes_values: &[S],
) -> RoundTripCorrection {
    let mut legs_per_mission: HashMap<&str, usize> = HashMap::new();
    for key in records.iter().filter_map(TripRecord::mission_key) {
        *legs_per_mission.entry(key).or_default() += 1;
    }

    let mut corrected = 0;
    let flags = records
        .iter()
        .map(|record| {
            let flag = RoundTripFlag::parse(&record.round_trip_flag, yes_values);
            let multi_leg = record
                .mission_key()
                .is_some_and(|key| legs_per_mission.get(key).copied().unwrap_or(0) > 1);

            if multi_leg && flag == RoundTripFlag::Yes {
                corrected += 1;
                RoundTripFlag::Corrected
            } else {
                flag
            }
        })
        .collect();

    if corrected > 0 {
        info!("Corrected {} round trips", corrected);
    }

    RoundTripCorrection { flags, corrected }
}
