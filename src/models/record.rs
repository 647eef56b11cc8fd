use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Composite dedup key of the persisted store
pub type RecordKey = (u64, DateTime<Utc>);

/// One cleaned, typed row of the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NormalizedRecord {
    #[serde(deserialize_with = "csv_fields::required_id")]
    pub sensor_id: u64,

    pub sensor_name: Option<String>,

    #[serde(deserialize_with = "csv_fields::optional_id", default)]
    pub location_id: Option<u64>,

    pub state: Option<String>,

    #[validate(length(min = 1))]
    pub sensor_tag: String,

    pub avg_value: f64,

    #[serde(with = "timestamp")]
    pub datetime_from: DateTime<Utc>,

    #[serde(with = "optional_timestamp", default)]
    pub datetime_to: Option<DateTime<Utc>>,
}

impl NormalizedRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sensor_id: u64,
        sensor_name: Option<String>,
        location_id: Option<u64>,
        state: Option<String>,
        sensor_tag: String,
        avg_value: f64,
        datetime_from: DateTime<Utc>,
        datetime_to: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            sensor_id,
            sensor_name,
            location_id,
            state,
            sensor_tag,
            avg_value,
            datetime_from,
            datetime_to,
        }
    }

    pub fn key(&self) -> RecordKey {
        (self.sensor_id, self.datetime_from)
    }
}

/// Integer id from a JSON number or a numeric string. Floats with no
/// fractional part are accepted since tabular tools write ids that way.
pub fn value_as_id(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(float_as_id)),
        Value::String(s) => parse_id(s),
        _ => None,
    }
}

pub fn value_as_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    parsed.is_finite().then_some(parsed)
}

pub fn value_as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn value_as_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value?.as_str().and_then(parse_timestamp)
}

/// RFC 3339 first, then the space-separated offset form written by dataframe
/// tools, then naive timestamps read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

fn parse_id(s: &str) -> Option<u64> {
    let s = s.trim();
    s.parse::<u64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(float_as_id))
}

fn float_as_id(f: f64) -> Option<u64> {
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

/// Timestamps are written as `2025-09-01T00:00:00Z`
pub mod timestamp {
    use super::parse_timestamp;
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }
}

/// Missing or unparseable end timestamps become `None`
pub mod optional_timestamp {
    use super::parse_timestamp;
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        dt: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_timestamp))
    }
}

mod csv_fields {
    use super::parse_id;
    use serde::{de, Deserialize, Deserializer};

    pub fn required_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_id(&raw).ok_or_else(|| de::Error::custom(format!("invalid id '{}'", raw)))
    }

    pub fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_id))
    }
}
