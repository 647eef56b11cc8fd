use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::utils::coordinates::{format_bbox, parse_bbox};

/// Time range and page size shared by every request of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub date_from: DateTime<Utc>,
    pub date_to: DateTime<Utc>,
    pub page_size: u32,
}

impl QueryWindow {
    pub fn new(date_from: DateTime<Utc>, date_to: DateTime<Utc>, page_size: u32) -> Result<Self> {
        if date_from > date_to {
            return Err(ProcessingError::Config(format!(
                "Start date {} is after end date {}",
                date_from, date_to
            )));
        }

        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ProcessingError::Config(format!(
                "Page size {} is outside [{}, {}]",
                page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }

        Ok(Self {
            date_from,
            date_to,
            page_size,
        })
    }

    /// `date_from`/`date_to` query parameters as ISO-8601 UTC strings
    pub fn date_params(&self) -> Vec<(String, String)> {
        vec![
            (
                "date_from".to_string(),
                self.date_from.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (
                "date_to".to_string(),
                self.date_to.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeoFilter {
    BoundingBox([f64; 4]),
    Country(String),
}

impl GeoFilter {
    /// The locations endpoint takes either `bbox=` or `iso=`
    pub fn query_param(&self) -> (String, String) {
        match self {
            GeoFilter::BoundingBox(bbox) => ("bbox".to_string(), format_bbox(bbox)),
            GeoFilter::Country(code) => ("iso".to_string(), code.clone()),
        }
    }
}

impl FromStr for GeoFilter {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();

        if trimmed.contains(',') {
            return Ok(GeoFilter::BoundingBox(parse_bbox(trimmed)?));
        }

        if (2..=3).contains(&trimmed.len()) && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Ok(GeoFilter::Country(trimmed.to_ascii_uppercase()));
        }

        Err(ProcessingError::InvalidFormat(format!(
            "Geographic filter '{}' is neither a bounding box nor a country code",
            s
        )))
    }
}

impl fmt::Display for GeoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoFilter::BoundingBox(bbox) => write!(f, "bbox {}", format_bbox(bbox)),
            GeoFilter::Country(code) => write!(f, "country {}", code),
        }
    }
}

/// A named geographic slice of the run; the tag lands in every record's `state`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub tag: String,
    pub filter: GeoFilter,
}

impl Region {
    pub fn new(tag: &str, filter: &str) -> Result<Self> {
        let tag = tag.trim().to_ascii_uppercase();
        if tag.is_empty() {
            return Err(ProcessingError::Config("Region tag is empty".to_string()));
        }

        Ok(Self {
            tag,
            filter: filter.parse()?,
        })
    }
}
