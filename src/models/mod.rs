//! Core data models for the classification pipeline.

pub mod record;
pub mod result;
pub mod territory;

pub use record::{Axis, ParsedCoordinate, Record, HEADER_ROWS};
pub use result::{ClassificationResult, Labels, Status, NA, OTROS};
pub use territory::{Territory, TerritorySet};
