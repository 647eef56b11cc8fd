use chrono::{DateTime, Utc};
use serde_json::Value;
use validator::Validate;

use crate::models::record::{value_as_f64, value_as_id, value_as_string, value_as_timestamp};
use crate::models::NormalizedRecord;

/// Fields pulled out of one raw record before the validity decision
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub sensor_id: Option<u64>,
    pub sensor_name: Option<String>,
    pub location_id: Option<u64>,
    pub state: Option<String>,
    pub sensor_tag: Option<String>,
    pub avg_value: Option<f64>,
    pub datetime_from: Option<DateTime<Utc>>,
    pub datetime_to: Option<DateTime<Utc>>,
}

impl ExtractedFields {
    pub fn from_raw(raw: &Value) -> Self {
        Self {
            sensor_id: value_as_id(raw.get("sensor_id")),
            sensor_name: value_as_string(raw.get("sensor_name")),
            location_id: value_as_id(raw.get("location_id")),
            state: value_as_string(raw.get("state")),
            sensor_tag: value_as_string(lookup(raw, &["parameter", "name"])),
            avg_value: value_as_f64(lookup(raw, &["summary", "avg"])),
            datetime_from: value_as_timestamp(lookup(raw, &["period", "datetimeFrom", "utc"])),
            datetime_to: value_as_timestamp(lookup(raw, &["period", "datetimeTo", "utc"])),
        }
    }

    /// Sensor id, parameter tag, average and window start must all be present
    pub fn is_valid(&self) -> bool {
        self.sensor_id.is_some()
            && self.sensor_tag.is_some()
            && self.avg_value.is_some()
            && self.datetime_from.is_some()
    }

    pub fn into_record(self) -> Option<NormalizedRecord> {
        if !self.is_valid() {
            return None;
        }

        let record = NormalizedRecord::new(
            self.sensor_id?,
            self.sensor_name,
            self.location_id,
            self.state,
            self.sensor_tag?,
            self.avg_value?,
            self.datetime_from?,
            self.datetime_to,
        );

        record.validate().ok().map(|_| record)
    }
}

/// Result of normalising one line of a raw JSONL file
#[derive(Debug)]
pub enum LineOutcome {
    Valid(NormalizedRecord),
    Invalid,
    Malformed(serde_json::Error),
    Blank,
}

pub struct RecordNormalizer;

impl RecordNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Project a raw record into the store schema, or `None` when a required
    /// field is missing or mistyped
    pub fn normalize(&self, raw: &Value) -> Option<NormalizedRecord> {
        ExtractedFields::from_raw(raw).into_record()
    }

    pub fn normalize_line(&self, line: &str) -> LineOutcome {
        self.normalize_bytes(line.as_bytes())
    }

    /// Same as [`RecordNormalizer::normalize_line`] for a line straight off
    /// disk. Invalid UTF-8 is reported as malformed like any other bad JSON.
    pub fn normalize_bytes(&self, line: &[u8]) -> LineOutcome {
        if line.iter().all(u8::is_ascii_whitespace) {
            return LineOutcome::Blank;
        }

        match serde_json::from_slice::<Value>(line) {
            Ok(raw) => match self.normalize(&raw) {
                Some(record) => LineOutcome::Valid(record),
                None => LineOutcome::Invalid,
            },
            Err(e) => LineOutcome::Malformed(e),
        }
    }
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk nested objects; any missing level yields `None`
fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}
