//! placemap-core: lazy catalogue, bounded dataset cache and filter/search
//! dispatch for browsing collections of geographic places.
//!
//! The main entry point is [`BrowseSession`], which wires together:
//! - [`CatalogueIndex`]: header-only descriptors of every dataset
//! - [`DatasetStore`]: LRU cache of loaded datasets with fetch coalescing
//! - [`LabelRegistry`]: label presentation metadata with per-dataset overrides
//! - [`Dispatcher`]: filter and search requests with stale-response discard
//!
//! All reads go through a [`ResourceFetcher`], so the same session runs over
//! a local directory, an HTTP server or in-memory documents.

pub mod api;
pub mod cache;
pub mod catalogue;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod labels;
pub mod models;
pub mod search;
pub mod session;
pub mod utils;

pub use api::{DirectoryFetcher, FetchError, HttpFetcher, MemoryFetcher, ResourceFetcher};
pub use cache::{CacheCapacity, DatasetStore, LoadedDataset};
pub use catalogue::{discover, CatalogueIndex, CatalogueLayout};
pub use config::{fetcher_for, Config};
pub use dispatch::{DispatchEvent, DispatchMode, Dispatcher, RequestKind};
pub use error::{CatalogueError, DatasetError};
pub use filter::{derive_facets, Facet, FilterSelection, DEFAULT_CATEGORY};
pub use labels::{LabelRegistry, LabelSource, LabelView};
pub use models::{Dataset, DatasetDescriptor, DatasetKind, Day, DayStop, LabelInfo, Place};
pub use search::SearchOptions;
pub use session::{BrowseSession, StopView};
