use crate::error::{ProcessingError, Result};
use crate::models::{NormalizedRecord, RecordKey};
use crate::readers::StoreReader;
use crate::writers::CsvWriter;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub records: Vec<NormalizedRecord>,
    pub existing_rows: usize,
    pub new_rows: usize,
    pub duplicates_removed: usize,
}

/// Set-union of record batches keyed by (sensor_id, datetime_from). Later
/// inputs override earlier ones, so fresh data always wins over the store.
pub struct DataMerger;

impl DataMerger {
    pub fn new() -> Self {
        Self
    }

    /// Collapse duplicate keys inside one batch, keeping the last occurrence.
    /// Returns the surviving rows (sorted by key) and the number removed.
    pub fn dedup(&self, records: Vec<NormalizedRecord>) -> (Vec<NormalizedRecord>, usize) {
        let total = records.len();
        let mut by_key: BTreeMap<RecordKey, NormalizedRecord> = BTreeMap::new();

        for record in records {
            by_key.insert(record.key(), record);
        }

        let removed = total - by_key.len();
        (by_key.into_values().collect(), removed)
    }

    /// Union the existing rows with a fresh batch; fresh rows override
    pub fn merge(
        &self,
        existing: Vec<NormalizedRecord>,
        fresh: Vec<NormalizedRecord>,
    ) -> MergeOutcome {
        let existing_rows = existing.len();
        let new_rows = fresh.len();

        let (records, duplicates_removed) = self.dedup(existing.into_iter().chain(fresh).collect());

        MergeOutcome {
            records,
            existing_rows,
            new_rows,
            duplicates_removed,
        }
    }

    /// Read the store at `store_path` (if any), merge `fresh` into it and
    /// atomically replace the file with the result. A store with rows that
    /// cannot be read back is never rewritten.
    pub fn merge_into_store(
        &self,
        fresh: Vec<NormalizedRecord>,
        store_path: &Path,
    ) -> Result<MergeOutcome> {
        let snapshot = StoreReader::new().read_store(store_path)?;
        if snapshot.skipped_rows > 0 {
            error!(
                store = %store_path.display(),
                skipped = snapshot.skipped_rows,
                "Store has unreadable rows, leaving it untouched"
            );
            return Err(ProcessingError::UnreadableStore(
                store_path.to_path_buf(),
                snapshot.skipped_rows,
            ));
        }
        if !snapshot.records.is_empty() {
            info!(
                rows = snapshot.records.len(),
                skipped = snapshot.skipped_rows,
                store = %store_path.display(),
                "Merging with existing store"
            );
        }

        let outcome = self.merge(snapshot.records, fresh);
        CsvWriter::new().write_records_atomic(&outcome.records, store_path)?;

        Ok(outcome)
    }
}

impl Default for DataMerger {
    fn default() -> Self {
        Self::new()
    }
}
