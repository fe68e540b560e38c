//! GeoJSON boundary dataset parsing.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use geo::MultiPolygon;
use geojson::{Feature, GeoJson};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{Labels, Territory, TerritorySet};

/// Feature property names holding the three labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelProperties {
    pub region: String,
    pub province: String,
    pub commune: String,
}

impl Default for LabelProperties {
    fn default() -> Self {
        Self {
            region: "Region".to_string(),
            province: "Provincia".to_string(),
            commune: "Comuna".to_string(),
        }
    }
}

/// Load territories from a GeoJSON file (`.gz` is decompressed)
pub fn load_territories(
    path: &Path,
    source_id: &str,
    properties: &LabelProperties,
) -> Result<TerritorySet> {
    info!("Loading boundaries from {}", path.display());

    let file = File::open(path)?;
    let mut reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut content = String::new();
    reader.read_to_string(&mut content)?;

    parse_territories(&content, source_id, properties)
}

/// Parse a GeoJSON document into territories, in feature order
pub fn parse_territories(
    content: &str,
    source_id: &str,
    properties: &LabelProperties,
) -> Result<TerritorySet> {
    let geojson: GeoJson = content.parse().map_err(|e| Error::InvalidBoundaryData {
        source_id: source_id.to_string(),
        reason: format!("Failed to parse GeoJSON: {}", e),
    })?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(Error::InvalidBoundaryData {
                source_id: source_id.to_string(),
                reason: "bare geometry has no label properties".to_string(),
            })
        }
    };

    let total = features.len();
    let territories: Vec<Territory> = features
        .into_iter()
        .enumerate()
        .filter_map(|(idx, feature)| convert_feature(idx, feature, properties))
        .collect();

    if territories.len() < total {
        warn!(
            "Skipped {} of {} features without polygon geometry",
            total - territories.len(),
            total
        );
    }

    let extent = territories
        .iter()
        .filter_map(Territory::bbox)
        .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)));
    info!(
        "Loaded {} territories from {} (extent {:?})",
        territories.len(),
        source_id,
        extent
    );

    Ok(TerritorySet::new(source_id, territories))
}

fn convert_feature(
    idx: usize,
    feature: Feature,
    properties: &LabelProperties,
) -> Option<Territory> {
    let labels = Labels::new(
        label(&feature, &properties.region),
        label(&feature, &properties.province),
        label(&feature, &properties.commune),
    );

    let geometry = match feature.geometry {
        Some(g) => g,
        None => {
            debug!("Feature {} has no geometry", idx);
            return None;
        }
    };

    let geometry = match geo_types::Geometry::<f64>::try_from(geometry) {
        Ok(g) => g,
        Err(e) => {
            debug!("Feature {} has unreadable geometry: {}", idx, e);
            return None;
        }
    };

    let polygons = match geometry {
        geo_types::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        geo_types::Geometry::MultiPolygon(mp) => mp,
        other => {
            debug!("Feature {} is not a polygon: {:?}", idx, other);
            return None;
        }
    };

    Some(Territory::new(labels, polygons))
}

fn label(feature: &Feature, key: &str) -> String {
    match feature.property(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
