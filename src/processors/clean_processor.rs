use crate::error::{ProcessingError, Result};
use crate::processors::DataMerger;
use crate::readers::RawReader;
use crate::utils::constants::STORE_FILE;
use crate::utils::filename::{cleaned_file_path, raw_file_path};
use crate::writers::CsvWriter;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Counts surfaced at the end of the clean stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanSummary {
    pub raw_lines: usize,
    pub malformed_lines: usize,
    pub invalid_records: usize,
    pub batch_duplicates: usize,
    pub cleaned_rows: usize,
    pub store_rows: Option<usize>,
}

impl CleanSummary {
    pub fn dropped(&self) -> usize {
        self.malformed_lines + self.invalid_records + self.batch_duplicates
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Clean Stage Report ===\n");
        summary.push_str(&format!("Raw lines: {}\n", self.raw_lines));
        summary.push_str(&format!("Malformed lines: {}\n", self.malformed_lines));
        summary.push_str(&format!("Invalid/incomplete records: {}\n", self.invalid_records));
        summary.push_str(&format!("Duplicates in batch: {}\n", self.batch_duplicates));
        summary.push_str(&format!("Cleaned rows: {}\n", self.cleaned_rows));
        match self.store_rows {
            Some(rows) => summary.push_str(&format!("Store rows: {}\n", rows)),
            None => summary.push_str("Store rows: unchanged\n"),
        }

        summary
    }
}

/// Normalise one day's raw file, write that day's cleaned CSV and fold it
/// into the persisted store
pub struct CleanProcessor {
    raw_dir: PathBuf,
    clean_dir: PathBuf,
    max_workers: usize,
}

impl CleanProcessor {
    pub fn new(raw_dir: impl Into<PathBuf>, clean_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            clean_dir: clean_dir.into(),
            max_workers: num_cpus::get(),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn store_path(&self) -> PathBuf {
        self.clean_dir.join(STORE_FILE)
    }

    pub fn process(&self, date: NaiveDate) -> Result<CleanSummary> {
        let raw_path = raw_file_path(&self.raw_dir, date);
        if !raw_path.exists() {
            error!(file = %raw_path.display(), "Raw file not found");
            return Err(ProcessingError::MissingInputFile(raw_path));
        }

        let outcome = RawReader::new(self.max_workers).read_file(&raw_path)?;
        let mut summary = CleanSummary {
            raw_lines: outcome.total_lines,
            malformed_lines: outcome.malformed_lines,
            invalid_records: outcome.invalid_records,
            ..CleanSummary::default()
        };

        if outcome.records.is_empty() {
            warn!(file = %raw_path.display(), "No valid records found, store left untouched");
            return Ok(summary);
        }

        let merger = DataMerger::new();
        let (batch, batch_duplicates) = merger.dedup(outcome.records);
        summary.batch_duplicates = batch_duplicates;
        summary.cleaned_rows = batch.len();

        info!(
            dropped = summary.dropped(),
            invalid = summary.invalid_records,
            malformed = summary.malformed_lines,
            duplicates = batch_duplicates,
            remaining = batch.len(),
            "Cleaned raw records"
        );

        let cleaned_path = cleaned_file_path(&self.clean_dir, date);
        CsvWriter::new().write_records_atomic(&batch, &cleaned_path)?;
        info!(file = %cleaned_path.display(), rows = batch.len(), "Saved cleaned data");

        let store_path = self.store_path();
        let merged = merger.merge_into_store(batch, &store_path)?;
        summary.store_rows = Some(merged.records.len());
        info!(
            file = %store_path.display(),
            rows = merged.records.len(),
            replaced = merged.duplicates_removed,
            "Store updated"
        );

        Ok(summary)
    }
}
