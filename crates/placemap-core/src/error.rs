use std::sync::Arc;

use thiserror::Error;

use crate::api::FetchError;

/// Failures that leave the session without any catalogue to browse.
#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("No catalogue available: none of {attempted} dataset locators could be read")]
    NoCatalogue { attempted: usize },
}

/// Dataset-scoped failures. The descriptor stays selectable and a later
/// `get_or_load` retries the fetch.
///
/// Clone so that every caller coalesced onto one fetch receives the error.
#[derive(Error, Debug, Clone)]
pub enum DatasetError {
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Failed to fetch dataset {id}: {source}")]
    Fetch {
        id: String,
        #[source]
        source: Arc<FetchError>,
    },

    #[error("Malformed dataset {id}: {reason}")]
    Malformed { id: String, reason: String },
}

impl DatasetError {
    /// Whether retrying the same id could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DatasetError::UnknownDataset(_))
    }
}
