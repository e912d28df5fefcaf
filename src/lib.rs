//! ts-status-stats: periodic Tailscale status collection into Parquet
//!
//! Every interval the status command is run, its JSON output is flattened
//! into a single record, and the record is appended to the day's Parquet file
//! under the configured base location.

mod collector;
mod init;
mod source;

pub use collector::{run, Collector, CycleError, PollState};
pub use init::init_tracing;
pub use source::{CommandSource, SourceError, StatusSource};

pub use ts_status_stats_config;
pub use ts_status_stats_core;
pub use ts_status_stats_writer;
