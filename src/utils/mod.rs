pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod logging;
pub mod progress;

pub use constants::*;
pub use coordinates::{format_bbox, parse_bbox};
pub use filename::{cleaned_file_path, default_parquet_path, raw_file_path, today_utc};
pub use logging::init_logging;
pub use progress::ProgressReporter;
