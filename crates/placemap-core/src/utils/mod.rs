//! String helpers and operation timing.

pub mod format;
pub mod timing;

pub use format::{cmp_ignore_case, contains_ignore_case, fold, format_age, truncate};
pub use timing::Stopwatch;
