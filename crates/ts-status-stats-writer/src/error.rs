//! Error types for the partitioned store

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while appending to a partition file
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record carries no columns at all
    #[error("Refusing to store a record with no fields")]
    EmptyRecord,

    /// Partition directory could not be created
    #[error("Failed to create partition directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Existing partition file could not be opened
    #[error("Failed to open partition file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Existing partition file is not readable Parquet
    #[error("Failed to read partition file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ParquetError,
    },

    /// Rows could not be decoded or merged with the new record
    #[error("Failed to merge rows for '{}': {source}", path.display())]
    Merge {
        path: PathBuf,
        #[source]
        source: ArrowError,
    },

    /// Parquet encoding of the combined rows failed
    #[error("Failed to write partition file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: ParquetError,
    },

    /// Temporary file handling failed (create, fsync, or rename)
    #[error("I/O error while replacing '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// File or directory the failure relates to, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::EmptyRecord => None,
            Self::CreateDir { path, .. }
            | Self::Open { path, .. }
            | Self::Read { path, .. }
            | Self::Merge { path, .. }
            | Self::Write { path, .. }
            | Self::Io { path, .. } => Some(path),
        }
    }
}

/// Result type alias for StoreError
pub type Result<T> = std::result::Result<T, StoreError>;
