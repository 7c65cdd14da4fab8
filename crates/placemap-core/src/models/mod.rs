//! Data models for browsable place collections.
//!
//! - `Place`, `Location`, `PlaceUrls`: a single point of interest
//! - `Dataset`, `Day`, `DayStop`: a theme or trip body
//! - `DatasetDescriptor`, `DatasetKind`: catalogue entries
//! - `LabelInfo`, `LabelPatch`: label presentation metadata
//! - `Transportation`: pass-through transport modes for trip stops

pub mod dataset;
pub mod label;
pub mod place;
pub mod transport;

pub use dataset::{Dataset, DatasetDescriptor, DatasetKind, DatasetParseError, Day, DayStop};
pub use label::{LabelInfo, LabelPatch, LabelRow, LabelTable, DEFAULT_LABEL_COLOR, DEFAULT_LABEL_ICON};
pub use place::{Location, Place, PlaceUrls};
pub use transport::{Transportation, TransportationTable};
