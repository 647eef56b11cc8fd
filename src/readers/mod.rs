pub mod raw_reader;
pub mod store_reader;

pub use raw_reader::{RawReadOutcome, RawReader};
pub use store_reader::{StoreReader, StoreSnapshot};
