//! Resource fetching for catalogue, label and dataset documents.
//!
//! Every remote or local read in the crate goes through the
//! [`ResourceFetcher`] trait so the catalogue index, the dataset store and
//! the label registry never know where bytes come from.
//!
//! Implementations:
//! - [`HttpFetcher`]: reqwest client against a base URL
//! - [`DirectoryFetcher`]: files below a local root directory
//! - [`MemoryFetcher`]: in-memory documents, used for embedding and tests

pub mod client;
pub mod error;
pub mod local;
pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

pub use client::HttpFetcher;
pub use error::FetchError;
pub use local::DirectoryFetcher;
pub use memory::MemoryFetcher;

/// Source of raw documents addressed by relative locators such as
/// `maps/jeju_food.json`.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the full body of a resource.
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError>;

    /// Enumerate the JSON documents directly below `dir`.
    async fn list(&self, _dir: &str) -> Result<Vec<String>, FetchError> {
        Err(FetchError::Unsupported(self.describe()))
    }

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Fetch a resource and deserialize it as JSON.
pub async fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn ResourceFetcher,
    locator: &str,
) -> Result<T, FetchError> {
    let body = fetcher.fetch(locator).await?;
    serde_json::from_slice(&body).map_err(|e| {
        FetchError::InvalidResponse(format!("Failed to parse JSON from {}: {}", locator, e))
    })
}

/// Reject locators that are empty or try to escape the data root.
pub(crate) fn validate_locator(locator: &str) -> Result<(), FetchError> {
    let trimmed = locator.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidLocator("empty locator".to_string()));
    }
    if trimmed.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(FetchError::InvalidLocator(locator.to_string()));
    }
    Ok(())
}

/// Join a directory and a file name into a forward-slash locator.
pub(crate) fn join_locator(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_locator() {
        assert!(validate_locator("maps/jeju_food.json").is_ok());
        assert!(validate_locator("system/labels.json").is_ok());
        assert!(validate_locator("").is_err());
        assert!(validate_locator("   ").is_err());
        assert!(validate_locator("../secrets.json").is_err());
        assert!(validate_locator("maps/../../etc/passwd").is_err());
        assert!(validate_locator("maps\\..\\x.json").is_err());
    }

    #[test]
    fn test_join_locator() {
        assert_eq!(join_locator("maps", "a.json"), "maps/a.json");
        assert_eq!(join_locator("/maps/", "a.json"), "maps/a.json");
        assert_eq!(join_locator("", "a.json"), "a.json");
    }

    #[tokio::test]
    async fn test_fetch_json_reports_parse_errors() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert("broken.json", "{not json");
        let result: Result<serde_json::Value, _> = fetch_json(&fetcher, "broken.json").await;
        assert!(matches!(result, Err(FetchError::InvalidResponse(_))));
    }
}
