use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::label::LabelPatch;
use super::place::Place;

/// Whether a dataset is a flat theme or a day-structured trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Theme,
    Trip,
}

impl DatasetKind {
    /// A dataset is a trip iff it declares at least one day.
    pub fn from_day_count(days: usize) -> Self {
        if days > 0 {
            DatasetKind::Trip
        } else {
            DatasetKind::Theme
        }
    }

    pub fn all() -> [DatasetKind; 2] {
        [DatasetKind::Theme, DatasetKind::Trip]
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetKind::Theme => write!(f, "theme"),
            DatasetKind::Trip => write!(f, "trip"),
        }
    }
}

/// Header-only summary of a dataset, produced by the catalogue index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct DatasetDescriptor {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub kind: DatasetKind,
    pub place_count: usize,
    pub locator: String,
}

/// One visit within a trip day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct DayStop {
    pub place_id: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_estimate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transportation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Day {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub places: Vec<DayStop>,
}

impl Day {
    /// Stops sorted by visit order (stable for equal orders)
    pub fn ordered_stops(&self) -> Vec<&DayStop> {
        let mut stops: Vec<&DayStop> = self.places.iter().collect();
        stops.sort_by_key(|s| s.order);
        stops
    }
}

/// Fully loaded dataset body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: DatasetKind,
    pub places: Vec<Place>,
    pub label_overrides: HashMap<String, LabelPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<Day>>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct DatasetParseError {
    pub reason: String,
}

impl DatasetParseError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// `places`, `days` and `labelOverrides` accept `null`, and their elements
/// are parsed one at a time, so any document the catalogue header accepts
/// also loads.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDataset {
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    places: Option<Vec<Value>>,
    #[serde(default, alias = "labelInfo")]
    label_overrides: Option<Value>,
    #[serde(default)]
    days: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct RawDay {
    title: Option<String>,
    date: Option<String>,
    #[serde(default)]
    places: Option<Vec<Value>>,
}

fn required(field: Option<String>, name: &str) -> Result<String, DatasetParseError> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DatasetParseError::new(format!("missing {}", name)))
}

impl Dataset {
    /// Parse and minimally validate a dataset document.
    ///
    /// Fails only when the document is not JSON or lacks `id`/`title`.
    /// Individual places, days, day stops or label overrides that do not
    /// parse are dropped, as are day stops that reference a place id the
    /// dataset does not declare.
    pub fn parse(body: &[u8]) -> Result<Self, DatasetParseError> {
        let raw: RawDataset = serde_json::from_slice(body)
            .map_err(|e| DatasetParseError::new(format!("invalid JSON: {}", e)))?;

        let id = required(raw.id, "id")?;
        let title = required(raw.title, "title")?;
        let raw_places = raw.places.unwrap_or_default();
        let raw_days = raw.days.unwrap_or_default();
        let kind = DatasetKind::from_day_count(raw_days.len());

        let mut seen = HashSet::new();
        let mut places = Vec::with_capacity(raw_places.len());
        for (index, value) in raw_places.into_iter().enumerate() {
            match serde_json::from_value::<Place>(value) {
                Ok(place) if seen.insert(place.id.clone()) => places.push(place),
                Ok(place) => {
                    warn!(dataset = %id, place = %place.id, "Duplicate place id, keeping first");
                }
                Err(e) => {
                    warn!(dataset = %id, index, error = %e, "Skipping unparseable place");
                }
            }
        }

        let days = match kind {
            DatasetKind::Theme => None,
            DatasetKind::Trip => Some(
                raw_days
                    .into_iter()
                    .enumerate()
                    .map(|(day_index, day)| Self::parse_day(&id, day_index, day, &seen))
                    .collect(),
            ),
        };
        let label_overrides = Self::parse_label_overrides(&id, raw.label_overrides);

        Ok(Self {
            id,
            title,
            description: raw.description.unwrap_or_default(),
            kind,
            places,
            label_overrides,
            days,
        })
    }

    fn parse_label_overrides(dataset_id: &str, value: Option<Value>) -> HashMap<String, LabelPatch> {
        let Some(Value::Object(entries)) = value else {
            return HashMap::new();
        };
        entries
            .into_iter()
            .filter_map(|(name, patch)| match serde_json::from_value::<LabelPatch>(patch) {
                Ok(patch) => Some((name, patch)),
                Err(e) => {
                    warn!(dataset = %dataset_id, label = %name, error = %e, "Skipping unparseable label override");
                    None
                }
            })
            .collect()
    }

    /// A day that does not parse is kept without stops so later days keep
    /// their index.
    fn parse_day(dataset_id: &str, day_index: usize, value: Value, known: &HashSet<String>) -> Day {
        let day = match serde_json::from_value::<RawDay>(value) {
            Ok(day) => day,
            Err(e) => {
                warn!(dataset = %dataset_id, day = day_index, error = %e, "Skipping unparseable day");
                return Day::default();
            }
        };
        let places = day
            .places
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<DayStop>(value) {
                Ok(stop) if known.contains(&stop.place_id) => Some(stop),
                Ok(stop) => {
                    warn!(
                        dataset = %dataset_id,
                        day = day_index,
                        place = %stop.place_id,
                        "Dropping day stop that references an unknown place"
                    );
                    None
                }
                Err(e) => {
                    warn!(dataset = %dataset_id, day = day_index, error = %e, "Skipping unparseable day stop");
                    None
                }
            })
            .collect();

        Day {
            title: day.title,
            date: day.date,
            places,
        }
    }

    pub fn place(&self, id: &str) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }

    pub fn day_count(&self) -> usize {
        self.days.as_ref().map(|d| d.len()).unwrap_or(0)
    }

    /// Stops of one trip day in visit order, paired with their places.
    /// Returns `None` for themes and out-of-range days.
    pub fn day_stops(&self, day_index: usize) -> Option<Vec<(&DayStop, &Place)>> {
        let day = self.days.as_ref()?.get(day_index)?;
        Some(
            day.ordered_stops()
                .into_iter()
                .filter_map(|stop| self.place(&stop.place_id).map(|place| (stop, place)))
                .collect(),
        )
    }
}
