//! Dataset discovery: a precomputed manifest, else directory enumeration.

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::index::CatalogueIndex;
use crate::api::{FetchError, ResourceFetcher};
use crate::error::CatalogueError;
use crate::models::DatasetDescriptor;

pub const DEFAULT_MANIFEST_PATH: &str = "manifest.json";
pub const DEFAULT_MAPS_DIR: &str = "maps";

/// Where the catalogue looks for its listing.
#[derive(Debug, Clone)]
pub struct CatalogueLayout {
    pub manifest: String,
    pub maps_dir: String,
}

impl Default for CatalogueLayout {
    fn default() -> Self {
        Self {
            manifest: DEFAULT_MANIFEST_PATH.to_string(),
            maps_dir: DEFAULT_MAPS_DIR.to_string(),
        }
    }
}

/// A manifest entry is either a bare locator, a full descriptor that needs
/// no fetch at all, or an object naming only the locator.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestEntry {
    Locator(String),
    Descriptor(DatasetDescriptor),
    Reference { locator: String },
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    datasets: Vec<ManifestEntry>,
}

async fn load_manifest(fetcher: &dyn ResourceFetcher, locator: &str) -> Option<Manifest> {
    match fetcher.fetch(locator).await {
        Ok(body) => match serde_json::from_slice::<Manifest>(&body) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!(manifest = %locator, error = %e, "Ignoring malformed manifest");
                None
            }
        },
        Err(FetchError::NotFound(_)) => {
            debug!(manifest = %locator, "No manifest, falling back to listing");
            None
        }
        Err(e) => {
            warn!(manifest = %locator, error = %e, "Failed to fetch manifest");
            None
        }
    }
}

/// Discover every dataset and build the catalogue index.
pub async fn discover(
    fetcher: &dyn ResourceFetcher,
    layout: &CatalogueLayout,
) -> Result<CatalogueIndex, CatalogueError> {
    if let Some(manifest) = load_manifest(fetcher, &layout.manifest).await {
        let attempted = manifest.datasets.len();
        info!(entries = attempted, "Building catalogue from manifest");

        // Fetch headers for bare locators only, then restore manifest order
        let pending: Vec<String> = manifest
            .datasets
            .iter()
            .filter_map(|entry| match entry {
                ManifestEntry::Locator(locator) | ManifestEntry::Reference { locator } => {
                    Some(locator.clone())
                }
                ManifestEntry::Descriptor(_) => None,
            })
            .collect();
        let mut fetched = CatalogueIndex::fetch_descriptors(fetcher, &pending)
            .await
            .into_iter()
            .peekable();

        let mut descriptors = Vec::with_capacity(attempted);
        for entry in manifest.datasets {
            match entry {
                ManifestEntry::Descriptor(descriptor) => descriptors.push(descriptor),
                ManifestEntry::Locator(locator) | ManifestEntry::Reference { locator } => {
                    if fetched.peek().map(|d| d.locator == locator).unwrap_or(false) {
                        if let Some(descriptor) = fetched.next() {
                            descriptors.push(descriptor);
                        }
                    }
                }
            }
        }
        return CatalogueIndex::from_descriptors(descriptors, attempted);
    }

    let locators = match fetcher.list(&layout.maps_dir).await {
        Ok(locators) => locators,
        Err(e) => {
            warn!(dir = %layout.maps_dir, error = %e, "No manifest and the maps directory cannot be listed");
            return Err(CatalogueError::NoCatalogue { attempted: 0 });
        }
    };
    info!(dir = %layout.maps_dir, found = locators.len(), "Building catalogue from listing");
    CatalogueIndex::build(fetcher, &locators).await
}
