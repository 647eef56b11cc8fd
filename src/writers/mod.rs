pub mod csv_writer;
pub mod parquet_writer;
pub mod raw_writer;

pub use csv_writer::CsvWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};
pub use raw_writer::RawWriter;
