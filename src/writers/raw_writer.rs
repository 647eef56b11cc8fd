use crate::error::Result;
use crate::utils::filename::{raw_file_path, today_utc};
use chrono::NaiveDate;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Append-only JSONL store, one file per UTC calendar date
pub struct RawWriter {
    raw_dir: PathBuf,
}

impl RawWriter {
    pub fn new(raw_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
        }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        raw_file_path(&self.raw_dir, date)
    }

    /// Destination for the current run; same-day re-runs share it
    pub fn today_path(&self) -> PathBuf {
        self.path_for(today_utc())
    }

    /// Append one JSON object per line, creating the file and its directory
    /// if needed. Returns the number of lines written.
    pub fn append_batch(&self, path: &Path, records: &[Value]) -> Result<usize> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);

        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_append_creates_directory_and_accumulates() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let writer = RawWriter::new(temp_dir.path().join("raw"));
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        let path = writer.path_for(date);

        writer.append_batch(&path, &[json!({"a": 1}), json!({"a": 2})])?;
        writer.append_batch(&path, &[json!({"a": 3})])?;

        let content = fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#"{"a":1}"#);
        assert_eq!(lines[2], r#"{"a":3}"#);
        assert!(path.ends_with("2025-09-01.jsonl"));

        Ok(())
    }

    #[test]
    fn test_non_ascii_is_preserved() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let writer = RawWriter::new(temp_dir.path());
        let path = writer.today_path();

        writer.append_batch(&path, &[json!({"units": "µg/m³"})])?;

        let content = fs::read_to_string(&path)?;
        assert!(content.contains("µg/m³"));

        Ok(())
    }
}
