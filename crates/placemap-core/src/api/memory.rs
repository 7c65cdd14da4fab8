use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{join_locator, validate_locator, FetchError, ResourceFetcher};

/// In-memory document source.
///
/// Counts every fetch per locator so callers can assert how often the
/// network would have been hit. An optional latency makes each fetch yield
/// to the runtime before completing.
#[derive(Default)]
pub struct MemoryFetcher {
    documents: Mutex<BTreeMap<String, Vec<u8>>>,
    fetches: Mutex<HashMap<String, usize>>,
    latency: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn insert(&self, locator: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(locator.into(), body.into());
    }

    pub fn remove(&self, locator: &str) {
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(locator);
    }

    /// Number of fetches issued for a locator, successful or not
    pub fn fetch_count(&self, locator: &str) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(locator)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .sum()
    }
}

#[async_trait]
impl ResourceFetcher for MemoryFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        validate_locator(locator)?;
        *self
            .fetches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(locator.to_string())
            .or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(locator)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(locator.to_string()))
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, FetchError> {
        let prefix = join_locator(dir, "");
        let documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        let listed: Vec<String> = documents
            .keys()
            .filter(|key| {
                key.strip_prefix(&prefix)
                    .map(|rest| !rest.contains('/') && rest.ends_with(".json"))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        if listed.is_empty() {
            return Err(FetchError::NotFound(dir.to_string()));
        }
        Ok(listed)
    }

    fn describe(&self) -> String {
        "memory fetcher".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_fetches_including_misses() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("maps/a.json", "{}");

        fetcher.fetch("maps/a.json").await.unwrap();
        fetcher.fetch("maps/a.json").await.unwrap();
        assert!(fetcher.fetch("maps/b.json").await.is_err());

        assert_eq!(fetcher.fetch_count("maps/a.json"), 2);
        assert_eq!(fetcher.fetch_count("maps/b.json"), 1);
        assert_eq!(fetcher.total_fetches(), 3);
    }

    #[tokio::test]
    async fn test_list_only_direct_json_children() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("maps/a.json", "{}");
        fetcher.insert("maps/nested/b.json", "{}");
        fetcher.insert("maps/readme.md", "");
        fetcher.insert("system/labels.json", "{}");

        assert_eq!(fetcher.list("maps").await.unwrap(), vec!["maps/a.json"]);
        assert!(fetcher.list("empty").await.is_err());
    }
}
