//! Transport classification
//!
//! Reduces the free-text list of modes reported for a trip to the single
//! category used for emissions. When several modes are reported for one leg
//! the highest-priority one wins: plane, then train, then car.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::TransportConfig;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransportCategory {
    Plane,
    Train,
    Car,
    /// No recognized mode; resolved from the distance before computing
    Unknown,
}

impl TransportCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plane => "plane",
            Self::Train => "train",
            Self::Car => "car",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one trip's transport tags
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: TransportCategory,
    /// Normalized tags found in none of the configured sets
    pub unknown_tags: Vec<String>,
}

/// Configured mode vocabulary, evaluated in priority order
#[derive(Debug, Clone)]
pub struct TransportTaxonomy {
    delimiter: char,
    priority: Vec<(HashSet<String>, TransportCategory)>,
    ignored: HashSet<String>,
}

impl TransportTaxonomy {
    #[must_use]
    pub fn new(
        delimiter: char,
        plane: &[String],
        train: &[String],
        car: &[String],
        ignored: &[String],
    ) -> Self {
        Self {
            delimiter,
            priority: vec![
                (normalize_set(plane), TransportCategory::Plane),
                (normalize_set(train), TransportCategory::Train),
                (normalize_set(car), TransportCategory::Car),
            ],
            ignored: normalize_set(ignored),
        }
    }

    #[must_use]
    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(
            config.delimiter,
            &config.plane,
            &config.train,
            &config.car,
            &config.ignored,
        )
    }

    /// Classify a raw tag field. A missing field classifies as `Unknown`.
    #[must_use]
    pub fn classify(&self, tags: Option<&str>) -> Classification {
        let Some(tags) = tags else {
            return Classification {
                category: TransportCategory::Unknown,
                unknown_tags: Vec::new(),
            };
        };

        let used = split_strip_lower(tags, self.delimiter);

        let unknown_tags = used
            .iter()
            .filter(|tag| !self.is_known(tag))
            .cloned()
            .collect();

        let category = self
            .priority
            .iter()
            .find(|(set, _)| used.iter().any(|tag| set.contains(tag)))
            .map_or(TransportCategory::Unknown, |(_, category)| *category);

        Classification {
            category,
            unknown_tags,
        }
    }

    fn is_known(&self, tag: &str) -> bool {
        self.ignored.contains(tag) || self.priority.iter().any(|(set, _)| set.contains(tag))
    }
}

/// Lower-case, split on `delimiter` and trim each element, dropping empty ones
#[must_use]
pub fn split_strip_lower(s: &str, delimiter: char) -> Vec<String> {
    s.to_lowercase()
        .split(delimiter)
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

fn normalize_set(tags: &[String]) -> HashSet<String> {
    tags.iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Unknown tags gathered across a run, sorted for stable diagnostics
#[derive(Debug, Default, Clone)]
pub struct UnknownTags(BTreeSet<String>);

impl UnknownTags {
    pub fn extend(&mut self, tags: impl IntoIterator<Item = String>) {
        self.0.extend(tags);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

impl fmt::Display for UnknownTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.0.iter().map(String::as_str).collect();
        write!(f, "{{{}}}", tags.join(", "))
    }
}
