pub mod store_analyzer;

pub use store_analyzer::{ParameterStats, StoreAnalyzer, StoreStatistics};
