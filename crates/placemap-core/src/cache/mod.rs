//! Bounded in-memory cache of loaded datasets.
//!
//! The `DatasetStore` keeps at most a configured number of datasets of each
//! kind resident, evicting the least recently used one when a kind goes
//! over capacity. Concurrent requests for the same id share a single fetch.
//! Failed loads are never cached.

pub mod store;

pub use store::{CacheCapacity, DatasetStore, LoadedDataset, DEFAULT_CAPACITY_PER_KIND};
