//! Coordinate normalization.
//!
//! Turns raw sheet text into signed decimal degrees. Parsing is total:
//! bad input becomes [`Axis::Invalid`] and is counted, never raised.

use crate::models::{Axis, ParsedCoordinate, Record};

/// Largest magnitude a degree value can legitimately have
pub const MAX_DEGREES: f64 = 180.0;

/// Scale of the integer encoding some rows were stored with (no decimal point)
pub const MISENCODED_SCALE: f64 = 1e8;

/// Normalize one latitude or longitude cell
pub fn normalize_axis(raw: &str) -> Axis {
    // Locale: decimal comma
    let text = raw.trim().replace(',', ".");

    let mut value = match text.parse::<f64>() {
        Ok(v) => v,
        Err(_) => return Axis::Invalid,
    };

    if value.abs() > MAX_DEGREES {
        value /= MISENCODED_SCALE;
    }

    if value.is_finite() {
        Axis::Valid(value)
    } else {
        Axis::Invalid
    }
}

/// Normalize a whole column, aligned by position
pub fn normalize_column<'a, I>(values: I) -> Vec<Axis>
where
    I: IntoIterator<Item = &'a str>,
{
    values.into_iter().map(normalize_axis).collect()
}

/// Parse both axes of a record. Invalid if either axis is.
pub fn parse_coordinate(latitude: &str, longitude: &str) -> ParsedCoordinate {
    ParsedCoordinate::from_axes(normalize_axis(latitude), normalize_axis(longitude))
}

/// Parse every record, preserving order
pub fn parse_records(records: &[Record]) -> Vec<ParsedCoordinate> {
    let lat = normalize_column(records.iter().map(|r| r.latitude.as_str()));
    let lon = normalize_column(records.iter().map(|r| r.longitude.as_str()));

    lat.into_iter()
        .zip(lon)
        .map(|(lat, lon)| ParsedCoordinate::from_axes(lat, lon))
        .collect()
}

/// Per-record invalid flag: latitude mask OR longitude mask
pub fn invalid_mask(records: &[Record]) -> Vec<bool> {
    parse_records(records)
        .iter()
        .map(|c| !c.is_valid())
        .collect()
}
