//! Facet derivation and multi-facet filtering over place labels.
//!
//! A [`FilterSelection`] maps a category name to the set of label values the
//! user has toggled on. Every category is matched against a place's labels:
//! values within one category are OR'ed, categories are AND'ed together.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::Place;

/// Category used when a caller does not name one
pub const DEFAULT_CATEGORY: &str = "place-type";

/// A label value with the number of places carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Facet {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSelection {
    categories: BTreeMap<String, BTreeSet<String>>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a value in a category. Returns whether it is now selected.
    pub fn toggle(&mut self, category: &str, value: &str) -> bool {
        let values = self.categories.entry(category.to_string()).or_default();
        let selected = if values.remove(value) {
            false
        } else {
            values.insert(value.to_string());
            true
        };
        if values.is_empty() {
            self.categories.remove(category);
        }
        selected
    }

    pub fn select(&mut self, category: &str, value: &str) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .insert(value.to_string());
    }

    pub fn clear(&mut self) {
        self.categories.clear();
    }

    /// True when no category has any selected value
    pub fn is_empty(&self) -> bool {
        self.categories.values().all(BTreeSet::is_empty)
    }

    pub fn is_selected(&self, category: &str, value: &str) -> bool {
        self.categories
            .get(category)
            .map(|values| values.contains(value))
            .unwrap_or(false)
    }

    /// Categories with at least one selected value
    pub fn active(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.categories
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(category, values)| (category.as_str(), values))
    }

    pub fn selected_count(&self) -> usize {
        self.categories.values().map(BTreeSet::len).sum()
    }

    /// Whether a single place satisfies the selection.
    pub fn matches(&self, place: &Place) -> bool {
        let mut active = self.active().peekable();
        if active.peek().is_none() {
            return true;
        }
        let Some(labels) = place.labels.as_deref() else {
            return false;
        };
        active.all(|(_, values)| labels.iter().any(|label| values.contains(label)))
    }
}

/// Every label in `places` with its place count, most frequent first, ties
/// in ascending lexical order.
pub fn derive_facets(places: &[Place]) -> Vec<Facet> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for place in places {
        let unique: HashSet<&str> = place.labels().iter().map(String::as_str).collect();
        for label in unique {
            *counts.entry(label).or_insert(0) += 1;
        }
    }

    let mut facets: Vec<Facet> = counts
        .into_iter()
        .map(|(value, count)| Facet {
            value: value.to_string(),
            count,
        })
        .collect();
    facets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    facets
}

/// Places passing `selection`, in input order.
pub fn apply(places: &[Place], selection: &FilterSelection) -> Vec<Place> {
    if selection.is_empty() {
        return places.to_vec();
    }
    places
        .iter()
        .filter(|place| selection.matches(place))
        .cloned()
        .collect()
}
