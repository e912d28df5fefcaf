use parquet::basic::Compression;
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::file::metadata::KeyValue;
use std::sync::OnceLock;

const ROW_GROUP_SIZE: usize = 32 * 1024;

fn compression_setting() -> Compression {
    Compression::SNAPPY
}

/// Get shared writer properties (cached)
///
/// Partition files hold one day of polls, so they stay small:
/// - Snappy compression
/// - Dictionary encoding enabled (status strings repeat on every row)
/// - 32k rows per group
/// - Writer version embedded in file metadata
pub(crate) fn writer_properties() -> &'static WriterProperties {
    static PROPERTIES: OnceLock<WriterProperties> = OnceLock::new();
    PROPERTIES.get_or_init(|| {
        let metadata = vec![KeyValue {
            key: "ts-status-stats.version".to_string(),
            value: Some(env!("CARGO_PKG_VERSION").to_string()),
        }];

        WriterProperties::builder()
            .set_dictionary_enabled(true)
            .set_statistics_enabled(EnabledStatistics::Page)
            .set_compression(compression_setting())
            .set_max_row_group_size(ROW_GROUP_SIZE)
            .set_key_value_metadata(Some(metadata))
            .build()
    })
}
