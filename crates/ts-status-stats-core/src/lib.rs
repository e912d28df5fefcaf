//! Core conversion of status documents into flat records
//!
//! A status document is an arbitrarily nested JSON tree. The flattener turns
//! it into a [`FlatRecord`]: one level of synthetic column names mapped to
//! scalar values, stamped with the capture time under [`TIMESTAMP_KEY`].
//!
//! This crate does no I/O. Storage lives in `ts-status-stats-writer`.

mod flatten;
mod record;

pub use flatten::{flatten_value, Flattener, DEFAULT_SEPARATOR, INDEX_SEPARATOR};
pub use record::{FlatRecord, Scalar, TIMESTAMP_KEY};

/// Nested status document as produced by the status source.
pub type RawDocument = serde_json::Value;

/// Placeholder substituted with `yyyymmdd` in file name templates.
pub const DATE_PLACEHOLDER: &str = "{date}";

/// Default file name template for daily partition files.
pub const DEFAULT_FILE_NAME_FORMAT: &str = "tailscale-status-{date}.parquet";
