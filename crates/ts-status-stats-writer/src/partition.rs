//! Partition path generation for date-based organization
//!
//! Files are grouped by local calendar month:
//! `{base}/{year}/{month:02}/{file_name_format with {date} -> yyyymmdd}`

use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};

pub use ts_status_stats_core::{DATE_PLACEHOLDER, DEFAULT_FILE_NAME_FORMAT};

/// Year/month partition for one capture date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    date: NaiveDate,
}

impl Partition {
    pub fn from_date(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// `yyyymmdd`
    pub fn date_str(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }

    /// `{year}/{month:02}` relative to the base location
    pub fn relative_dir(&self) -> PathBuf {
        PathBuf::from(self.year().to_string()).join(format!("{:02}", self.month()))
    }

    pub fn directory(&self, base: &Path) -> PathBuf {
        base.join(self.relative_dir())
    }

    pub fn file_name(&self, template: &str) -> String {
        render_file_name(template, &self.date_str())
    }

    pub fn file_path(&self, base: &Path, template: &str) -> PathBuf {
        self.directory(base).join(self.file_name(template))
    }
}

/// Substitute `date_str` for every `{date}` in `template`.
pub fn render_file_name(template: &str, date_str: &str) -> String {
    template.replace(DATE_PLACEHOLDER, date_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pi_day() -> Partition {
        Partition::from_date(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap())
    }

    #[test]
    fn test_default_template_path() {
        let path = pi_day().file_path(Path::new("/data"), DEFAULT_FILE_NAME_FORMAT);
        assert_eq!(
            path,
            PathBuf::from("/data/2025/03/tailscale-status-20250314.parquet")
        );
    }

    #[test]
    fn test_custom_template() {
        assert_eq!(
            pi_day().file_name("ts-{date}-custom.parquet"),
            "ts-20250314-custom.parquet"
        );
    }

    #[test]
    fn test_month_is_zero_padded() {
        let partition = pi_day();
        assert_eq!(partition.relative_dir(), PathBuf::from("2025/03"));

        let december = Partition::from_date(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(december.relative_dir(), PathBuf::from("2024/12"));
        assert_eq!(december.date_str(), "20241201");
    }

    #[test]
    fn test_template_without_placeholder() {
        assert_eq!(render_file_name("static.parquet", "20250314"), "static.parquet");
        assert_eq!(
            render_file_name("{date}/{date}.parquet", "20250314"),
            "20250314/20250314.parquet"
        );
    }
}
