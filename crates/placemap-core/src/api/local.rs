use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{join_locator, validate_locator, FetchError, ResourceFetcher};

/// Reads documents from a local data directory.
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, locator: &str) -> PathBuf {
        self.root.join(locator.trim_start_matches('/'))
    }
}

#[async_trait]
impl ResourceFetcher for DirectoryFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        validate_locator(locator)?;
        let path = self.path_for(locator);
        let body = tokio::fs::read(&path)
            .await
            .map_err(|e| FetchError::from_io(locator, e))?;
        debug!(path = %path.display(), bytes = body.len(), "Read resource");
        Ok(body)
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, FetchError> {
        if !dir.trim_matches('/').is_empty() {
            validate_locator(dir)?;
        }
        let mut entries = tokio::fs::read_dir(self.path_for(dir))
            .await
            .map_err(|e| FetchError::from_io(dir, e))?;

        let mut locators = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FetchError::from_io(dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file && name.ends_with(".json") {
                locators.push(join_locator(dir, &name));
            }
        }
        // read_dir order is platform dependent
        locators.sort();
        Ok(locators)
    }

    fn describe(&self) -> String {
        format!("directory fetcher at {}", self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_and_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("maps")).unwrap();
        std::fs::write(dir.path().join("maps/b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("maps/a.json"), "{\"id\":\"a\"}").unwrap();
        std::fs::write(dir.path().join("maps/notes.txt"), "skip me").unwrap();

        let fetcher = DirectoryFetcher::new(dir.path());
        let listed = fetcher.list("maps").await.unwrap();
        assert_eq!(listed, vec!["maps/a.json", "maps/b.json"]);

        let body = fetcher.fetch("maps/a.json").await.unwrap();
        assert_eq!(body, b"{\"id\":\"a\"}");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = DirectoryFetcher::new(dir.path());
        let result = fetcher.fetch("maps/none.json").await;
        assert!(matches!(result, Err(FetchError::NotFound(_))));

        let listed = fetcher.list("maps").await;
        assert!(matches!(listed, Err(FetchError::NotFound(_))));
    }
}
