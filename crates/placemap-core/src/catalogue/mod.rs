//! Catalogue of available datasets.
//!
//! Builds lightweight `DatasetDescriptor`s from a manifest or a directory
//! listing without loading place bodies. The resulting `CatalogueIndex` is
//! immutable and shared with the dataset store, which resolves ids to
//! locators through it.

pub mod index;
pub mod manifest;

pub use index::{classify, CatalogueIndex, RawHeader};
pub use manifest::{discover, CatalogueLayout, DEFAULT_MANIFEST_PATH, DEFAULT_MAPS_DIR};
