use crate::error::{ProcessingError, Result};
use crate::models::NormalizedRecord;
use crate::readers::StoreReader;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct StoreStatistics {
    pub total_records: usize,
    pub skipped_rows: usize,
    pub unique_sensors: usize,
    pub unique_locations: usize,
    pub date_range: (DateTime<Utc>, DateTime<Utc>),
    pub parameters: BTreeMap<String, ParameterStats>,
    pub regions: BTreeMap<String, usize>,
}

/// Aggregate of `avg_value` over every row of one pollutant
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStats {
    pub count: usize,
    pub sensors: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

#[derive(Default)]
struct ParameterAccumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
    sensors: HashSet<u64>,
}

impl ParameterAccumulator {
    fn add(&mut self, record: &NormalizedRecord) {
        if self.count == 0 {
            self.min = record.avg_value;
            self.max = record.avg_value;
        } else {
            self.min = self.min.min(record.avg_value);
            self.max = self.max.max(record.avg_value);
        }
        self.count += 1;
        self.sum += record.avg_value;
        self.sensors.insert(record.sensor_id);
    }

    fn finish(self) -> ParameterStats {
        ParameterStats {
            count: self.count,
            sensors: self.sensors.len(),
            min: self.min,
            max: self.max,
            mean: self.sum / self.count as f64,
        }
    }
}

pub struct StoreAnalyzer;

impl StoreAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_store(&self, path: &Path) -> Result<StoreStatistics> {
        let snapshot = StoreReader::new().read_store(path)?;

        let mut stats = self.calculate_statistics(&snapshot.records)?;
        stats.skipped_rows = snapshot.skipped_rows;
        Ok(stats)
    }

    pub fn calculate_statistics(&self, records: &[NormalizedRecord]) -> Result<StoreStatistics> {
        let first = records
            .first()
            .ok_or_else(|| ProcessingError::InvalidFormat("Store contains no records".to_string()))?;

        let mut sensors = HashSet::new();
        let mut locations = HashSet::new();
        let mut min_date = first.datetime_from;
        let mut max_date = first.datetime_from;
        let mut parameters: BTreeMap<String, ParameterAccumulator> = BTreeMap::new();
        let mut regions: BTreeMap<String, usize> = BTreeMap::new();

        for record in records {
            sensors.insert(record.sensor_id);
            if let Some(location_id) = record.location_id {
                locations.insert(location_id);
            }

            min_date = min_date.min(record.datetime_from);
            max_date = max_date.max(record.datetime_from);

            parameters
                .entry(record.sensor_tag.to_ascii_lowercase())
                .or_default()
                .add(record);

            let region = record.state.clone().unwrap_or_else(|| "unknown".to_string());
            *regions.entry(region).or_insert(0) += 1;
        }

        Ok(StoreStatistics {
            total_records: records.len(),
            skipped_rows: 0,
            unique_sensors: sensors.len(),
            unique_locations: locations.len(),
            date_range: (min_date, max_date),
            parameters: parameters
                .into_iter()
                .map(|(tag, acc)| (tag, acc.finish()))
                .collect(),
            regions,
        })
    }
}

impl Default for StoreAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreStatistics {
    pub fn summary(&self) -> String {
        format!(
            "Parameters: {}\n\
            Sensors: {} sensors at {} locations\n\
            Date Range: {} to {} ({} days)\n\
            Records: {} total ({} unreadable rows skipped)",
            self.parameters.keys().cloned().collect::<Vec<_>>().join(", "),
            self.unique_sensors,
            self.unique_locations,
            self.date_range.0.date_naive(),
            self.date_range.1.date_naive(),
            self.date_range
                .1
                .signed_duration_since(self.date_range.0)
                .num_days()
                + 1,
            self.total_records,
            self.skipped_rows,
        )
    }

    pub fn detailed_summary(&self) -> String {
        let mut out = self.summary();

        out.push_str("\n\nPer Parameter (daily averages):");
        for (tag, stats) in &self.parameters {
            out.push_str(&format!(
                "\n- {}: {} rows from {} sensors, mean {:.3}, min {:.3}, max {:.3}",
                tag, stats.count, stats.sensors, stats.mean, stats.min, stats.max
            ));
        }

        out.push_str("\n\nPer Region:");
        for (region, count) in &self.regions {
            out.push_str(&format!("\n- {}: {} rows", region, count));
        }

        out
    }
}
