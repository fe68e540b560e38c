//! Reference territories loaded from the boundary dataset.

use geo::{BoundingRect, Centroid, MultiPolygon, Point};

use super::Labels;

/// A single territory polygon with its labels
#[derive(Debug, Clone)]
pub struct Territory {
    pub labels: Labels,
    pub geometry: MultiPolygon<f64>,
}

impl Territory {
    pub fn new(labels: Labels, geometry: MultiPolygon<f64>) -> Self {
        Self { labels, geometry }
    }

    /// Geometric centroid, `None` for empty geometry
    pub fn centroid(&self) -> Option<Point<f64>> {
        self.geometry.centroid()
    }

    /// Get the bounding box of this territory
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }
}

/// Ordered territory collection from one boundary dataset
#[derive(Debug, Clone)]
pub struct TerritorySet {
    /// Identity of the dataset the territories were loaded from
    pub source: String,
    pub territories: Vec<Territory>,
}

impl TerritorySet {
    pub fn new(source: impl Into<String>, territories: Vec<Territory>) -> Self {
        Self {
            source: source.into(),
            territories,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Territory> {
        self.territories.get(index)
    }

    pub fn len(&self) -> usize {
        self.territories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }
}
