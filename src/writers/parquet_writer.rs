use crate::error::{ProcessingError, Result};
use crate::models::NormalizedRecord;
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Columnar export of the persisted store for downstream analysis
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write records in row-group sized batches
    pub fn write_records(&self, records: &[NormalizedRecord], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let schema = self.create_schema();
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        for chunk in records.chunks(self.row_group_size) {
            let batch = self.records_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }
        writer.close()?;

        Ok(())
    }

    fn create_schema(&self) -> Arc<Schema> {
        let utc_millis = DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()));
        let fields = vec![
            Field::new("sensor_id", DataType::UInt64, false),
            Field::new("sensor_name", DataType::Utf8, true),
            Field::new("location_id", DataType::UInt64, true),
            Field::new("state", DataType::Utf8, true),
            Field::new("sensor_tag", DataType::Utf8, false),
            Field::new("avg_value", DataType::Float64, false),
            Field::new("datetime_from", utc_millis.clone(), false),
            Field::new("datetime_to", utc_millis, true),
        ];

        Arc::new(Schema::new(fields))
    }

    fn records_to_batch(
        &self,
        records: &[NormalizedRecord],
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let sensor_ids: UInt64Array = records.iter().map(|r| Some(r.sensor_id)).collect();
        let sensor_names: StringArray = records.iter().map(|r| r.sensor_name.as_deref()).collect();
        let location_ids: UInt64Array = records.iter().map(|r| r.location_id).collect();
        let states: StringArray = records.iter().map(|r| r.state.as_deref()).collect();
        let sensor_tags: StringArray = records.iter().map(|r| Some(r.sensor_tag.as_str())).collect();
        let avg_values: Float64Array = records.iter().map(|r| Some(r.avg_value)).collect();
        let datetime_from: TimestampMillisecondArray = records
            .iter()
            .map(|r| Some(r.datetime_from.timestamp_millis()))
            .collect();
        let datetime_to: TimestampMillisecondArray = records
            .iter()
            .map(|r| r.datetime_to.map(|dt| dt.timestamp_millis()))
            .collect();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(sensor_ids),
            Arc::new(sensor_names),
            Arc::new(location_ids),
            Arc::new(states),
            Arc::new(sensor_tags),
            Arc::new(avg_values),
            Arc::new(datetime_from.with_timezone("UTC")),
            Arc::new(datetime_to.with_timezone("UTC")),
        ];

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        Ok(ParquetFileInfo {
            total_rows: metadata.file_metadata().num_rows(),
            row_groups: metadata.num_row_groups(),
            file_size: std::fs::metadata(path)?.len(),
            compression: self.compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: usize,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
        )
    }
}
