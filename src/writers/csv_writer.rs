use crate::error::Result;
use crate::models::NormalizedRecord;
use crate::utils::constants::STORE_COLUMNS;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes store-shaped CSV files with write-then-rename semantics, so a crash
/// mid-write leaves the previous file intact.
pub struct CsvWriter;

impl CsvWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_records_atomic(&self, records: &[NormalizedRecord], path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut temp_file = NamedTempFile::new_in(parent)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(temp_file.as_file_mut());

            // Header is written explicitly so an empty store still has one
            writer.write_record(STORE_COLUMNS)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        temp_file.as_file_mut().flush()?;
        temp_file.as_file().sync_all()?;

        temp_file.persist(path)?;
        Ok(())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}
