//! Territorio - nearest-territory classification of field coordinates
//!
//! This library provides the shared pipeline for the geocode and ledger
//! binaries: coordinate normalization, a nearest-centroid boundary index,
//! classification, and bulk write-back to Google Sheets.

pub mod bookkeeping;
pub mod boundary;
pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod sheets;

pub use error::{Error, Result};
pub use models::{ClassificationResult, Labels, Record, Territory, TerritorySet};
