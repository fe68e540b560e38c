//! Classification output rows.

use serde::{Deserialize, Serialize};

/// Label written for valid coordinates beyond the distance threshold
pub const OTROS: &str = "OTROS";
/// Label written for unparseable coordinates
pub const NA: &str = "NA";

/// Region / province / commune triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    pub region: String,
    pub province: String,
    pub commune: String,
}

impl Labels {
    pub fn new(
        region: impl Into<String>,
        province: impl Into<String>,
        commune: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            province: province.into(),
            commune: commune.into(),
        }
    }

    /// Same value in all three columns
    pub fn uniform(value: &str) -> Self {
        Self::new(value, value, value)
    }

    pub fn outside() -> Self {
        Self::uniform(OTROS)
    }

    pub fn invalid() -> Self {
        Self::uniform(NA)
    }

    /// Cell values in output column order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.region.clone(),
            self.province.clone(),
            self.commune.clone(),
        ]
    }
}

/// How a row ended up with its labels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Status {
    /// Nearest centroid within the threshold
    Matched { territory: usize, distance: f64 },
    /// Nearest centroid beyond the threshold
    Outside { distance: f64 },
    /// Coordinate failed to parse
    Invalid,
}

/// One classified row, keyed by its original sheet row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub row: u32,
    pub labels: Labels,
    pub status: Status,
}

impl ClassificationResult {
    pub fn invalid(row: u32) -> Self {
        Self {
            row,
            labels: Labels::invalid(),
            status: Status::Invalid,
        }
    }
}
