use crate::error::Result;
use crate::models::NormalizedRecord;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;
use validator::Validate;

/// Rows recovered from an existing store file
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    pub records: Vec<NormalizedRecord>,
    pub skipped_rows: usize,
}

pub struct StoreReader;

impl StoreReader {
    pub fn new() -> Self {
        Self
    }

    /// Read the persisted store. A missing or zero-length file is an empty
    /// store; rows that no longer satisfy the schema are skipped with a
    /// warning and counted in `skipped_rows`. Any other I/O failure is an error.
    pub fn read_store(&self, path: &Path) -> Result<StoreSnapshot> {
        let mut snapshot = StoreSnapshot::default();

        match fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => {}
            Ok(_) => return Ok(snapshot),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(snapshot),
            Err(e) => return Err(e.into()),
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        for (index, row) in reader.deserialize::<NormalizedRecord>().enumerate() {
            match row {
                Ok(record) if record.validate().is_ok() => snapshot.records.push(record),
                Ok(_) => {
                    warn!(row = index + 1, "Store row has an empty sensor tag, skipping");
                    snapshot.skipped_rows += 1;
                }
                Err(e) => {
                    warn!(row = index + 1, error = %e, "Unreadable store row, skipping");
                    snapshot.skipped_rows += 1;
                }
            }
        }

        Ok(snapshot)
    }
}

impl Default for StoreReader {
    fn default() -> Self {
        Self::new()
    }
}
