pub mod query;
pub mod record;
pub mod sensor;

pub use query::{GeoFilter, QueryWindow, Region};
pub use record::{parse_timestamp, NormalizedRecord, RecordKey};
pub use sensor::SensorDescriptor;
