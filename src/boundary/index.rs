//! Spatial index for nearest-centroid territory lookups.

use geo::Point;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::TerritorySet;

/// Territory centroid tagged with its position in the [`TerritorySet`]
type CentroidEntry = GeomWithData<[f64; 2], usize>;

/// Nearest territory for a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Index into the territory set
    pub territory: usize,
    /// Planar Euclidean distance to the centroid, in coordinate units
    pub distance: f64,
}

/// R-tree over territory centroids
pub struct BoundaryIndex {
    tree: RTree<CentroidEntry>,
    territory_count: usize,
}

impl BoundaryIndex {
    /// Build the index from a loaded territory set.
    ///
    /// Territories whose centroid cannot be computed (empty geometry) are
    /// left out. A set with no indexable territory is a configuration error.
    pub fn build(set: &TerritorySet) -> Result<Self> {
        info!("Building spatial index for {} territories...", set.len());

        let entries: Vec<CentroidEntry> = set
            .territories
            .iter()
            .enumerate()
            .filter_map(|(idx, territory)| match territory.centroid() {
                Some(c) => Some(GeomWithData::new([c.x(), c.y()], idx)),
                None => {
                    warn!("Territory {} has no centroid, skipping", idx);
                    None
                }
            })
            .collect();

        if entries.is_empty() {
            return Err(Error::EmptyBoundaryDataset {
                source_id: set.source.clone(),
            });
        }

        let tree = RTree::bulk_load(entries);
        info!("Spatial index built with {} entries", tree.size());

        Ok(Self {
            tree,
            territory_count: set.len(),
        })
    }

    /// Nearest centroid to a point.
    ///
    /// Among centroids at exactly the same minimal distance, the lowest
    /// territory index wins.
    pub fn nearest(&self, point: Point<f64>) -> Option<Nearest> {
        let query = [point.x(), point.y()];
        let mut candidates = self.tree.nearest_neighbor_iter_with_distance_2(&query);

        let (first, best_d2) = candidates.next()?;
        let mut best = first.data;

        for (entry, d2) in candidates {
            if d2 > best_d2 {
                break;
            }
            best = best.min(entry.data);
        }

        Some(Nearest {
            territory: best,
            distance: best_d2.sqrt(),
        })
    }

    /// Nearest centroid for every point, aligned by position
    pub fn nearest_batch(&self, points: &[Point<f64>]) -> Vec<Option<Nearest>> {
        points.iter().map(|p| self.nearest(*p)).collect()
    }

    /// Get total number of indexed centroids
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Size of the territory set the index was built from
    pub fn territory_count(&self) -> usize {
        self.territory_count
    }
}
