// Catalogue index: header-only descriptors of every discoverable dataset.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::ResourceFetcher;
use crate::error::CatalogueError;
use crate::models::{DatasetDescriptor, DatasetKind};
use crate::utils::Stopwatch;

/// Maximum concurrent header fetches while building the index.
const MAX_CONCURRENT_HEADER_FETCHES: usize = 10;

/// The header fields of a dataset document.
///
/// `days` and `places` are deserialized as opaque sequences so only their
/// lengths are kept; place bodies are never materialised.
#[derive(Debug, Deserialize, Default)]
pub struct RawHeader {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub days: Option<Vec<IgnoredAny>>,
    #[serde(default)]
    pub places: Option<Vec<IgnoredAny>>,
}

impl RawHeader {
    pub fn parse(body: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(body).map_err(|e| format!("malformed header: {}", e))
    }

    pub fn day_count(&self) -> usize {
        self.days.as_ref().map_or(0, Vec::len)
    }

    pub fn place_count(&self) -> usize {
        self.places.as_ref().map_or(0, Vec::len)
    }

    pub fn into_descriptor(self, locator: &str) -> Result<DatasetDescriptor, String> {
        let kind = classify(&self);
        let place_count = self.place_count();
        let id = self
            .id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or("header has no id")?;
        let title = self
            .title
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or("header has no title")?;
        Ok(DatasetDescriptor {
            id,
            title,
            description: self.description.unwrap_or_default(),
            kind,
            place_count,
            locator: locator.to_string(),
        })
    }
}

/// Trip iff the header declares a non-empty day array; theme otherwise.
pub fn classify(header: &RawHeader) -> DatasetKind {
    DatasetKind::from_day_count(header.day_count())
}

async fn fetch_descriptor(
    fetcher: &dyn ResourceFetcher,
    locator: &str,
) -> Result<DatasetDescriptor, String> {
    let body = fetcher.fetch(locator).await.map_err(|e| e.to_string())?;
    RawHeader::parse(&body)?.into_descriptor(locator)
}

/// Immutable set of dataset descriptors, in discovery order.
#[derive(Debug, Clone)]
pub struct CatalogueIndex {
    descriptors: Vec<DatasetDescriptor>,
    by_id: HashMap<String, usize>,
    built_at: DateTime<Utc>,
}

impl CatalogueIndex {
    /// Build descriptors for `locators`, reading only header fields.
    ///
    /// Unreadable locators are logged and skipped. Only when nothing at all
    /// could be read does this fail with [`CatalogueError::NoCatalogue`].
    pub async fn build(
        fetcher: &dyn ResourceFetcher,
        locators: &[String],
    ) -> Result<Self, CatalogueError> {
        let descriptors = Self::fetch_descriptors(fetcher, locators).await;
        Self::from_descriptors(descriptors, locators.len())
    }

    pub(crate) async fn fetch_descriptors(
        fetcher: &dyn ResourceFetcher,
        locators: &[String],
    ) -> Vec<DatasetDescriptor> {
        let watch = Stopwatch::start("catalogue_build");

        let results: Vec<(String, Result<DatasetDescriptor, String>)> =
            stream::iter(locators.iter().cloned())
                .map(|locator| async move {
                    let result = fetch_descriptor(fetcher, &locator).await;
                    (locator, result)
                })
                .buffered(MAX_CONCURRENT_HEADER_FETCHES)
                .collect()
                .await;

        let mut descriptors = Vec::with_capacity(results.len());
        for (locator, result) in results {
            match result {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(reason) => {
                    warn!(locator = %locator, reason = %reason, "Skipping unreadable dataset");
                }
            }
        }

        watch.finish();
        descriptors
    }

    /// Assemble an index from already known descriptors. Later duplicates
    /// of an id are dropped.
    pub fn from_descriptors(
        descriptors: Vec<DatasetDescriptor>,
        attempted: usize,
    ) -> Result<Self, CatalogueError> {
        let mut kept = Vec::with_capacity(descriptors.len());
        let mut by_id = HashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if by_id.contains_key(&descriptor.id) {
                warn!(id = %descriptor.id, locator = %descriptor.locator, "Duplicate dataset id, keeping first");
                continue;
            }
            by_id.insert(descriptor.id.clone(), kept.len());
            kept.push(descriptor);
        }

        if kept.is_empty() {
            return Err(CatalogueError::NoCatalogue { attempted });
        }

        info!(
            datasets = kept.len(),
            attempted,
            themes = kept.iter().filter(|d| d.kind == DatasetKind::Theme).count(),
            trips = kept.iter().filter(|d| d.kind == DatasetKind::Trip).count(),
            "Catalogue index built"
        );

        Ok(Self {
            descriptors: kept,
            by_id,
            built_at: Utc::now(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&DatasetDescriptor> {
        self.by_id.get(id).map(|&i| &self.descriptors[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetDescriptor> {
        self.descriptors.iter()
    }

    pub fn by_kind(&self, kind: DatasetKind) -> impl Iterator<Item = &DatasetDescriptor> {
        self.descriptors.iter().filter(move |d| d.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryFetcher;

    fn theme_json(id: &str, places: usize) -> String {
        let places: Vec<String> = (0..places)
            .map(|i| format!(r#"{{"id":"p{}","title":"Place {}","location":{{"lat":0.0,"lng":0.0}}}}"#, i, i))
            .collect();
        format!(r#"{{"id":"{}","title":"Title {}","places":[{}]}}"#, id, id, places.join(","))
    }

    #[test]
    fn test_classify_is_stable() {
        let trip = br#"{"id":"t","title":"T","days":[{"places":[]}],"places":[]}"#;
        let theme = br#"{"id":"a","title":"A","days":[],"places":[]}"#;
        let no_days = br#"{"id":"b","title":"B","places":[]}"#;

        for _ in 0..3 {
            assert_eq!(classify(&RawHeader::parse(trip).unwrap()), DatasetKind::Trip);
            assert_eq!(classify(&RawHeader::parse(theme).unwrap()), DatasetKind::Theme);
            assert_eq!(classify(&RawHeader::parse(no_days).unwrap()), DatasetKind::Theme);
        }
    }

    #[test]
    fn test_header_counts_places_without_parsing_them() {
        // Place bodies that would not parse as `Place` still count
        let body = br#"{"id":"x","title":"X","places":[{"weird":true},1,"two",null]}"#;
        let descriptor = RawHeader::parse(body).unwrap().into_descriptor("maps/x.json").unwrap();
        assert_eq!(descriptor.place_count, 4);
        assert_eq!(descriptor.kind, DatasetKind::Theme);
    }

    #[test]
    fn test_indexed_documents_also_load() {
        let bodies: [&[u8]; 4] = [
            br#"{"id":"a","title":"A","places":null,"days":null}"#,
            br#"{"id":"b","title":"B","places":[],"days":[1,{"places":null}]}"#,
            br#"{"id":"c","title":"C","labelOverrides":[],"days":[{"title":3}]}"#,
            br#"{"id":"d","title":"D","places":[{"weird":true}],"days":[{"places":[{"order":"x"}]}]}"#,
        ];
        for body in bodies {
            let header = RawHeader::parse(body).unwrap();
            let day_count = header.day_count();
            let descriptor = header.into_descriptor("maps/x.json").unwrap();
            let dataset = crate::models::Dataset::parse(body).unwrap();
            assert_eq!(dataset.id, descriptor.id);
            assert_eq!(dataset.kind, descriptor.kind);
            assert_eq!(dataset.day_count(), day_count);
        }
    }

    #[tokio::test]
    async fn test_build_skips_unreadable_locators() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("maps/a.json", theme_json("a", 3));
        fetcher.insert("maps/bad.json", "{ this is not json");
        fetcher.insert("maps/untitled.json", r#"{"id":"u"}"#);
        fetcher.insert(
            "maps/t.json",
            r#"{"id":"t","title":"Trip","days":[{"places":[]}],"places":[]}"#,
        );

        let locators: Vec<String> = ["maps/a.json", "maps/bad.json", "maps/missing.json", "maps/untitled.json", "maps/t.json"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let index = CatalogueIndex::build(&fetcher, &locators).await.unwrap();
        assert_eq!(index.len(), 2);
        let ids: Vec<&str> = index.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "t"]);
        assert_eq!(index.get("a").unwrap().place_count, 3);
        assert_eq!(index.get("t").unwrap().kind, DatasetKind::Trip);
        assert_eq!(index.by_kind(DatasetKind::Trip).count(), 1);
    }

    #[tokio::test]
    async fn test_build_with_zero_descriptors_is_no_catalogue() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("maps/bad.json", "nope");
        let locators = vec!["maps/bad.json".to_string(), "maps/gone.json".to_string()];

        let result = CatalogueIndex::build(&fetcher, &locators).await;
        assert!(matches!(result, Err(CatalogueError::NoCatalogue { attempted: 2 })));
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_first() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("maps/one.json", theme_json("same", 1));
        fetcher.insert("maps/two.json", theme_json("same", 2));
        let locators = vec!["maps/one.json".to_string(), "maps/two.json".to_string()];

        let index = CatalogueIndex::build(&fetcher, &locators).await.unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("same").unwrap().locator, "maps/one.json");
    }
}
