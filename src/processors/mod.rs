pub mod clean_processor;
pub mod data_merger;
pub mod normalizer;

pub use clean_processor::{CleanProcessor, CleanSummary};
pub use data_merger::{DataMerger, MergeOutcome};
pub use normalizer::{ExtractedFields, LineOutcome, RecordNormalizer};
