//! Input rows read from the worksheet and their parsed coordinates.

use std::collections::HashMap;

/// Rows above the first data row (the header). Data row `i` lives at
/// sheet row `i + HEADER_ROWS + 1`.
pub const HEADER_ROWS: u32 = 1;

/// One worksheet row as read from the records source
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based sheet row
    pub row: u32,
    pub latitude: String,
    pub longitude: String,
    /// Remaining cells keyed by header, untouched by classification
    pub passthrough: HashMap<String, String>,
}

impl Record {
    pub fn new(row: u32, latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            row,
            latitude: latitude.into(),
            longitude: longitude.into(),
            passthrough: HashMap::new(),
        }
    }

    /// Sheet row for the data row at `index` (0-based, header excluded)
    pub fn row_for_index(index: usize) -> u32 {
        index as u32 + HEADER_ROWS + 1
    }
}

/// Result of normalizing a single coordinate axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Axis {
    Valid(f64),
    Invalid,
}

impl Axis {
    pub fn value(self) -> Option<f64> {
        match self {
            Axis::Valid(v) => Some(v),
            Axis::Invalid => None,
        }
    }

    pub fn is_valid(self) -> bool {
        matches!(self, Axis::Valid(_))
    }
}

/// A latitude/longitude pair, or the invalid marker when either axis failed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedCoordinate {
    Valid { lat: f64, lon: f64 },
    Invalid,
}

impl ParsedCoordinate {
    pub fn from_axes(lat: Axis, lon: Axis) -> Self {
        match (lat, lon) {
            (Axis::Valid(lat), Axis::Valid(lon)) => ParsedCoordinate::Valid { lat, lon },
            _ => ParsedCoordinate::Invalid,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedCoordinate::Valid { .. })
    }

    /// Planar point in (x = lon, y = lat) order
    pub fn point(&self) -> Option<geo::Point<f64>> {
        match *self {
            ParsedCoordinate::Valid { lat, lon } => Some(geo::Point::new(lon, lat)),
            ParsedCoordinate::Invalid => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_for_index_skips_header() {
        assert_eq!(Record::row_for_index(0), 2);
        assert_eq!(Record::row_for_index(41), 43);
    }

    #[test]
    fn test_one_bad_axis_invalidates_coordinate() {
        assert_eq!(
            ParsedCoordinate::from_axes(Axis::Invalid, Axis::Valid(-70.65)),
            ParsedCoordinate::Invalid
        );
        assert_eq!(
            ParsedCoordinate::from_axes(Axis::Valid(-33.45), Axis::Invalid),
            ParsedCoordinate::Invalid
        );
    }

    #[test]
    fn test_point_is_lon_lat() {
        let coord = ParsedCoordinate::from_axes(Axis::Valid(-33.45), Axis::Valid(-70.65));
        let point = coord.point().unwrap();
        assert_eq!(point.x(), -70.65);
        assert_eq!(point.y(), -33.45);
    }
}
