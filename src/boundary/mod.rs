//! Reference territory boundaries.
//!
//! Loads the boundary dataset into [`TerritorySet`]s, caches them per
//! dataset, and builds the nearest-centroid [`BoundaryIndex`].

mod cache;
mod index;
mod territory;

pub use cache::{BoundaryCache, DatasetSource};
pub use index::{BoundaryIndex, Nearest};
pub use territory::{load_territories, parse_territories, LabelProperties};

pub use crate::models::{Territory, TerritorySet};
