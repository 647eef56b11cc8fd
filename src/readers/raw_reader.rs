use crate::error::{ProcessingError, Result};
use crate::models::NormalizedRecord;
use crate::processors::normalizer::{LineOutcome, RecordNormalizer};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

/// Normalised contents of one raw JSONL file plus what had to be dropped
#[derive(Debug, Default)]
pub struct RawReadOutcome {
    pub records: Vec<NormalizedRecord>,
    pub total_lines: usize,
    pub malformed_lines: usize,
    pub invalid_records: usize,
}

pub struct RawReader {
    max_workers: usize,
    normalizer: RecordNormalizer,
}

impl RawReader {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            normalizer: RecordNormalizer::new(),
        }
    }

    /// Read a raw file and normalise every line. Lines are parsed on a rayon
    /// pool; results keep file order so later lines stay "more recent".
    pub fn read_file(&self, path: &Path) -> Result<RawReadOutcome> {
        if !path.exists() {
            return Err(ProcessingError::MissingInputFile(path.to_path_buf()));
        }

        let file = File::open(path)?;
        // UTF-8 is checked per line by the normalizer
        let reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let lines = reader.split(b'\n').collect::<std::io::Result<Vec<Vec<u8>>>>()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let outcomes: Vec<LineOutcome> = pool.install(|| {
            lines
                .par_iter()
                .map(|line| self.normalizer.normalize_bytes(line))
                .collect()
        });

        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut outcome = RawReadOutcome::default();
        for (index, line_outcome) in outcomes.into_iter().enumerate() {
            match line_outcome {
                LineOutcome::Blank => continue,
                LineOutcome::Valid(record) => outcome.records.push(record),
                LineOutcome::Invalid => outcome.invalid_records += 1,
                LineOutcome::Malformed(e) => {
                    warn!(file = %file_name, line = index + 1, error = %e, "Malformed JSON line");
                    outcome.malformed_lines += 1;
                }
            }
            outcome.total_lines += 1;
        }

        debug!(
            file = %file_name,
            lines = outcome.total_lines,
            valid = outcome.records.len(),
            invalid = outcome.invalid_records,
            malformed = outcome.malformed_lines,
            "Read raw file"
        );

        Ok(outcome)
    }
}

impl Default for RawReader {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
