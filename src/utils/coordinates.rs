use crate::error::{ProcessingError, Result};

/// Parse a bounding box of four comma-separated decimal coordinates
/// (`min_lon,min_lat,max_lon,max_lat`), the order the locations endpoint expects.
///
/// # Examples
/// ```
/// use openaq_pipeline::utils::parse_bbox;
///
/// let bbox = parse_bbox("-71.1,43.0,-66.9,47.5").unwrap();
/// assert_eq!(bbox, [-71.1, 43.0, -66.9, 47.5]);
/// ```
pub fn parse_bbox(bbox: &str) -> Result<[f64; 4]> {
    let parts: Vec<&str> = bbox.split(',').map(|s| s.trim()).collect();

    if parts.len() != 4 {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Invalid bounding box: '{}'. Expected 'min_lon,min_lat,max_lon,max_lat'",
            bbox
        )));
    }

    let mut values = [0.0; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = parse_coordinate(part)?;
    }

    let [min_lon, min_lat, max_lon, max_lat] = values;
    validate_longitude(min_lon)?;
    validate_longitude(max_lon)?;
    validate_latitude(min_lat)?;
    validate_latitude(max_lat)?;

    if min_lon > max_lon || min_lat > max_lat {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Bounding box corners are inverted: '{}'",
            bbox
        )));
    }

    Ok(values)
}

/// Parse a single decimal coordinate
pub fn parse_coordinate(coord_str: &str) -> Result<f64> {
    let trimmed = coord_str.trim();
    let value = trimmed.parse::<f64>().map_err(|_| {
        ProcessingError::InvalidCoordinate(format!("Invalid coordinate value: '{}'", coord_str))
    })?;

    if !value.is_finite() {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Coordinate is not finite: '{}'",
            coord_str
        )));
    }

    Ok(value)
}

pub fn validate_latitude(latitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Latitude {} is outside [-90, 90]",
            latitude
        )));
    }
    Ok(())
}

pub fn validate_longitude(longitude: f64) -> Result<()> {
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Longitude {} is outside [-180, 180]",
            longitude
        )));
    }
    Ok(())
}

/// Render a bounding box back into the query-string form
pub fn format_bbox(bbox: &[f64; 4]) -> String {
    bbox.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
