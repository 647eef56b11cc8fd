use crate::utils::constants::{CLEANED_FILE_PREFIX, RAW_FILE_EXTENSION};
use chrono::{Datelike, NaiveDate, Utc};
use std::path::{Path, PathBuf};

/// Current calendar date in UTC; raw and cleaned files are keyed on it
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Raw file for a UTC date: `{raw_dir}/YYYY-MM-DD.jsonl`
pub fn raw_file_path(raw_dir: &Path, date: NaiveDate) -> PathBuf {
    raw_dir.join(format!(
        "{}.{}",
        date.format("%Y-%m-%d"),
        RAW_FILE_EXTENSION
    ))
}

/// Cleaned per-run file: `{clean_dir}/cleaned_data_YYYY-MM-DD.csv`
pub fn cleaned_file_path(clean_dir: &Path, date: NaiveDate) -> PathBuf {
    clean_dir.join(format!(
        "{}{}.csv",
        CLEANED_FILE_PREFIX,
        date.format("%Y-%m-%d")
    ))
}

/// Generate default Parquet export filename with format: openaq-store-{YYMMDD}.parquet
pub fn default_parquet_path(clean_dir: &Path, date: NaiveDate) -> PathBuf {
    let year = date.year() % 100;
    let filename = format!(
        "openaq-store-{:02}{:02}{:02}.parquet",
        year,
        date.month(),
        date.day()
    );
    clean_dir.join(filename)
}
