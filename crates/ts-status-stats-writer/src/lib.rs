//! Date-partitioned Parquet storage for flattened status records
//!
//! Each append lands in `{base}/{yyyy}/{mm}/{file name}` where the file name
//! is a template with `{date}` replaced by the local `yyyymmdd`. A file holds
//! every record captured that day; its columns are the union of all keys
//! seen, with nulls where a record lacked a key.

mod encoding;
mod error;
mod partition;
mod schema;
mod store;

pub use error::{Result, StoreError};
pub use partition::{render_file_name, Partition, DATE_PLACEHOLDER, DEFAULT_FILE_NAME_FORMAT};
pub use store::{read_rows, PartitionedStore, StoredRows};

// Re-export commonly used types for convenience
pub use ts_status_stats_core;
