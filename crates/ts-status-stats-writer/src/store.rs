// Partitioned append store
//
// Parquet files cannot be appended to in place, so every append reads the
// day's file, adds one row, and rewrites it. The new content is written to a
// temporary sibling, fsynced, then renamed over the target so an interrupted
// write never leaves a truncated partition file behind.
//
// Single writer only: two processes appending to the same base location can
// lose rows.

use crate::encoding::writer_properties;
use crate::error::{Result, StoreError};
use crate::partition::Partition;
use crate::schema::{append_record, record_batch, record_schema};
use arrow::array::RecordBatch;
use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use chrono::{Local, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::errors::ParquetError;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use ts_status_stats_core::FlatRecord;

/// Rows read back from a partition file.
#[derive(Debug, Clone)]
pub struct StoredRows {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl StoredRows {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// All rows as one batch.
    pub fn concat(&self) -> std::result::Result<RecordBatch, arrow::error::ArrowError> {
        concat_batches(&self.schema, &self.batches)
    }
}

/// Appends flat records to `{base}/{yyyy}/{mm}/{file name}` Parquet files.
#[derive(Debug, Clone)]
pub struct PartitionedStore {
    base_dir: PathBuf,
    file_name_format: String,
}

impl PartitionedStore {
    pub fn new(base_dir: impl Into<PathBuf>, file_name_format: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            file_name_format: file_name_format.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Target file for `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        Partition::from_date(date).file_path(&self.base_dir, &self.file_name_format)
    }

    /// Append `record` to today's file (local calendar).
    ///
    /// The partition comes from the wall clock at call time, not from the
    /// record's `_timestamp`.
    pub fn append(&self, record: &FlatRecord) -> Result<PathBuf> {
        self.append_on(record, Local::now().date_naive())
    }

    /// Append `record` to the file for `date`, creating it if needed.
    pub fn append_on(&self, record: &FlatRecord, date: NaiveDate) -> Result<PathBuf> {
        if record.is_empty() {
            return Err(StoreError::EmptyRecord);
        }

        let partition = Partition::from_date(date);
        let dir = partition.directory(&self.base_dir);
        fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(partition.file_name(&self.file_name_format));
        let exists = path.try_exists().map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;

        let merged = if exists {
            let stored = read_rows(&path)?;
            debug!(
                path = %path.display(),
                existing_rows = stored.num_rows(),
                existing_columns = stored.schema.fields().len(),
                "Merging record into existing partition file"
            );
            append_record(&stored.schema, &stored.batches, record)
        } else {
            let schema: SchemaRef = Arc::new(record_schema(record));
            record_batch(record, &schema)
        };
        let batch = merged.map_err(|source| StoreError::Merge {
            path: path.clone(),
            source,
        })?;

        write_replace(&dir, &path, &batch, exists)?;

        info!(
            path = %path.display(),
            rows = batch.num_rows(),
            columns = batch.num_columns(),
            created = !exists,
            "Wrote partition file"
        );

        Ok(path)
    }
}

/// Read every row of a partition file.
pub fn read_rows(path: &Path) -> Result<StoredRows> {
    let file = File::open(path).map_err(|source| StoreError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let schema = builder.schema().clone();
    let reader = builder.build().map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    // Page data is only decoded here, so corrupt pages surface as ArrowError
    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source: ParquetError::ArrowError(source.to_string()),
        })?;

    Ok(StoredRows { schema, batches })
}

/// Encode `batch` into a temporary file in `dir` and rename it over `path`.
///
/// A replaced file keeps its permissions; a new one gets the process umask.
fn write_replace(dir: &Path, path: &Path, batch: &RecordBatch, replacing: bool) -> Result<()> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let write_err = |source: ParquetError| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let prefix = format!(
        ".{}.",
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    let existing_permissions = if replacing {
        Some(fs::metadata(path).map_err(io_err)?.permissions())
    } else {
        None
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(".tmp");
    set_new_file_permissions(&mut builder);
    let mut tmp = builder.tempfile_in(dir).map_err(io_err)?;

    {
        let props = writer_properties().clone();
        let mut writer =
            ArrowWriter::try_new(tmp.as_file_mut(), batch.schema(), Some(props)).map_err(write_err)?;
        writer.write(batch).map_err(write_err)?;
        writer.close().map_err(write_err)?;
    }

    if let Some(permissions) = existing_permissions {
        tmp.as_file().set_permissions(permissions).map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}

// tempfile defaults to 0600; ask for 0666 and let the umask narrow it.
#[cfg(unix)]
fn set_new_file_permissions(builder: &mut tempfile::Builder<'_, '_>) {
    use std::os::unix::fs::PermissionsExt;
    builder.permissions(fs::Permissions::from_mode(0o666));
}

#[cfg(not(unix))]
fn set_new_file_permissions(_builder: &mut tempfile::Builder<'_, '_>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ts_status_stats_core::Flattener;

    #[test]
    fn test_empty_record_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartitionedStore::new(dir.path(), "x-{date}.parquet");

        let err = store.append(&FlatRecord::default()).unwrap_err();

        assert!(matches!(err, StoreError::EmptyRecord));
        assert!(err.path().is_none());
    }

    #[test]
    fn test_no_temporary_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartitionedStore::new(dir.path(), "x-{date}.parquet");
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let record = Flattener::default().flatten(&json!({"a": 1}));

        let path = store.append_on(&record, date).unwrap();
        store.append_on(&record, date).unwrap();

        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["x-20250314.parquet".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_new_file_mode_follows_umask() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = PartitionedStore::new(dir.path(), "x-{date}.parquet");
        let record = Flattener::default().flatten(&json!({"a": 1}));

        let path = store.append(&record).unwrap();

        let mode = fs::metadata(path).unwrap().permissions().mode() & 0o777;
        // Never wider than 0666, never executable, always owner read/write
        assert_eq!(mode & !0o666, 0, "mode {mode:o}");
        assert_eq!(mode & 0o600, 0o600, "mode {mode:o}");
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = PartitionedStore::new(dir.path(), "x-{date}.parquet");
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let record = Flattener::default().flatten(&json!({"a": 1}));

        let path = store.append_on(&record, date).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
        store.append_on(&record, date).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "mode {mode:o}");
        assert_eq!(read_rows(&path).unwrap().num_rows(), 2);
    }

    #[test]
    fn test_base_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("not-a-dir");
        fs::write(&base, b"").unwrap();
        let store = PartitionedStore::new(&base, "x-{date}.parquet");
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        let err = store
            .append_on(&Flattener::default().flatten(&json!({"a": 1})), date)
            .unwrap_err();

        assert!(matches!(err, StoreError::CreateDir { .. }), "{err}");
        assert_eq!(err.path(), Some(base.join("2025").join("03").as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_partition_dir_is_io_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = PartitionedStore::new(dir.path(), "x-{date}.parquet");
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let partition_dir = store.path_for(date).parent().unwrap().to_path_buf();
        fs::create_dir_all(&partition_dir).unwrap();
        fs::set_permissions(&partition_dir, fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not bind a privileged user
        if fs::write(partition_dir.join("write-check"), b"").is_ok() {
            fs::set_permissions(&partition_dir, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = store.append_on(&Flattener::default().flatten(&json!({"a": 1})), date);
        fs::set_permissions(&partition_dir, fs::Permissions::from_mode(0o755)).unwrap();

        let err = result.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }), "{err}");
        assert_eq!(err.path(), Some(store.path_for(date).as_path()));
    }

    #[test]
    fn test_corrupt_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartitionedStore::new(dir.path(), "x-{date}.parquet");
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let path = store.path_for(date);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not parquet").unwrap();

        let record = Flattener::default().flatten(&json!({"a": 1}));
        let err = store.append_on(&record, date).unwrap_err();

        assert!(matches!(err, StoreError::Read { .. }), "{err}");
        assert_eq!(err.path(), Some(path.as_path()));
        // The corrupt file is left untouched for inspection
        assert_eq!(fs::read(&path).unwrap(), b"not parquet");
    }
}
