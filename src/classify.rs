//! Territory classification of worksheet records.

use geo::Point;
use tracing::{debug, info};

use crate::boundary::BoundaryIndex;
use crate::error::{Error, Result};
use crate::models::{ClassificationResult, Labels, Record, Status, TerritorySet};
use crate::normalize::parse_records;

/// Default maximum centroid distance, in coordinate units (degrees)
pub const DEFAULT_THRESHOLD: f64 = 1.0;

/// Classified rows plus the counts reported to the user
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Valid rows first, then invalid rows, each in input order
    pub results: Vec<ClassificationResult>,
    pub valid: usize,
    pub invalid: usize,
}

impl Classification {
    pub fn total(&self) -> usize {
        self.valid + self.invalid
    }

    /// Rows classified outside every territory
    pub fn outside(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.status, Status::Outside { .. }))
            .count()
    }

    /// First `n` results by sheet row
    pub fn preview(&self, n: usize) -> Vec<&ClassificationResult> {
        let mut rows: Vec<&ClassificationResult> = self.results.iter().collect();
        rows.sort_by_key(|r| r.row);
        rows.truncate(n);
        rows
    }
}

/// Classify every record against the boundary index
pub fn classify(
    records: &[Record],
    index: &BoundaryIndex,
    territories: &TerritorySet,
    threshold: f64,
) -> Result<Classification> {
    let coords = parse_records(records);

    // Partition, keeping the sheet row alongside each valid point
    let mut valid_rows = Vec::new();
    let mut points: Vec<Point<f64>> = Vec::new();
    let mut invalid_rows = Vec::new();

    for (record, coord) in records.iter().zip(&coords) {
        match coord.point() {
            Some(p) => {
                valid_rows.push(record.row);
                points.push(p);
            }
            None => invalid_rows.push(record.row),
        }
    }

    info!(
        "Classifying {} records ({} valid, {} invalid)",
        records.len(),
        valid_rows.len(),
        invalid_rows.len()
    );

    let nearest = index.nearest_batch(&points);

    let mut results = Vec::with_capacity(records.len());

    for (row, hit) in valid_rows.iter().zip(nearest) {
        let hit = hit.ok_or_else(|| Error::EmptyBoundaryDataset {
            source_id: territories.source.clone(),
        })?;

        let territory = territories
            .get(hit.territory)
            .ok_or(Error::UnknownTerritory {
                index: hit.territory,
            })?;

        let result = if hit.distance > threshold {
            debug!("Row {} is {:.3} from nearest centroid", row, hit.distance);
            ClassificationResult {
                row: *row,
                labels: Labels::outside(),
                status: Status::Outside {
                    distance: hit.distance,
                },
            }
        } else {
            ClassificationResult {
                row: *row,
                labels: territory.labels.clone(),
                status: Status::Matched {
                    territory: hit.territory,
                    distance: hit.distance,
                },
            }
        };
        results.push(result);
    }

    results.extend(invalid_rows.iter().map(|row| ClassificationResult::invalid(*row)));

    Ok(Classification {
        results,
        valid: valid_rows.len(),
        invalid: invalid_rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Territory, NA, OTROS};
    use geo::{polygon, MultiPolygon};
    use std::collections::HashSet;

    fn santiago() -> TerritorySet {
        // Centroid at (-70.65, -33.45)
        let p = polygon![
            (x: -70.9, y: -33.7),
            (x: -70.4, y: -33.7),
            (x: -70.4, y: -33.2),
            (x: -70.9, y: -33.2),
            (x: -70.9, y: -33.7),
        ];
        let q = polygon![
            (x: -72.0, y: -37.0),
            (x: -71.0, y: -37.0),
            (x: -71.0, y: -36.0),
            (x: -72.0, y: -36.0),
            (x: -72.0, y: -37.0),
        ];
        TerritorySet::new(
            "test",
            vec![
                Territory::new(
                    Labels::new("Metropolitana", "Santiago", "Santiago"),
                    MultiPolygon::new(vec![p]),
                ),
                Territory::new(
                    Labels::new("Biobio", "Biobio", "Los Angeles"),
                    MultiPolygon::new(vec![q]),
                ),
            ],
        )
    }

    fn records(raw: &[(&str, &str)]) -> Vec<Record> {
        raw.iter()
            .enumerate()
            .map(|(i, (lat, lon))| Record::new(Record::row_for_index(i), *lat, *lon))
            .collect()
    }

    fn run(raw: &[(&str, &str)]) -> Classification {
        let set = santiago();
        let index = BoundaryIndex::build(&set).unwrap();
        classify(&records(raw), &index, &set, DEFAULT_THRESHOLD).unwrap()
    }

    fn labels_for(c: &Classification, row: u32) -> Labels {
        c.results.iter().find(|r| r.row == row).unwrap().labels.clone()
    }

    #[test]
    fn test_comma_decimal_matches_territory() {
        let c = run(&[("-33,45", "-70,65")]);
        assert_eq!(
            labels_for(&c, 2),
            Labels::new("Metropolitana", "Santiago", "Santiago")
        );
    }

    #[test]
    fn test_misencoded_matches_same_territory() {
        let c = run(&[("-3345000000", "-7065000000"), ("-33,45", "-70,65")]);
        assert_eq!(labels_for(&c, 2), labels_for(&c, 3));
        assert_eq!(labels_for(&c, 2).commune, "Santiago");
    }

    #[test]
    fn test_invalid_latitude_gives_na() {
        let c = run(&[("abc", "-70.65")]);
        assert_eq!(labels_for(&c, 2), Labels::uniform(NA));
        assert_eq!(c.invalid, 1);
        assert_eq!(c.valid, 0);
    }

    #[test]
    fn test_far_point_gives_otros() {
        let c = run(&[("10.0", "10.0")]);
        assert_eq!(labels_for(&c, 2), Labels::uniform(OTROS));
        assert_eq!(c.outside(), 1);
    }

    #[test]
    fn test_threshold_boundary_is_inside() {
        // Single territory centred on the origin
        let p = polygon![
            (x: -1.0, y: -1.0),
            (x: 1.0, y: -1.0),
            (x: 1.0, y: 1.0),
            (x: -1.0, y: 1.0),
            (x: -1.0, y: -1.0),
        ];
        let set = TerritorySet::new(
            "origin",
            vec![Territory::new(Labels::uniform("O"), MultiPolygon::new(vec![p]))],
        );
        let index = BoundaryIndex::build(&set).unwrap();

        let at = records(&[("0", "1")]);
        let distance = index.nearest(Point::new(1.0, 0.0)).unwrap().distance;

        // Exactly at the threshold counts as inside
        let c = classify(&at, &index, &set, distance).unwrap();
        assert_eq!(c.results[0].labels, Labels::uniform("O"));
        assert!(matches!(c.results[0].status, Status::Matched { territory: 0, .. }));

        let c = classify(&at, &index, &set, distance * 0.999).unwrap();
        assert_eq!(c.results[0].labels, Labels::outside());
    }

    #[test]
    fn test_one_result_per_row_with_unique_positions() {
        let raw = [
            ("-33.45", "-70.65"),
            ("x", "y"),
            ("-36.5", "-71.5"),
            ("", "-70"),
            ("50", "50"),
            ("-33,4", "-70,6"),
        ];
        let c = run(&raw);
        assert_eq!(c.results.len(), raw.len());
        assert_eq!(c.total(), raw.len());

        let rows: HashSet<u32> = c.results.iter().map(|r| r.row).collect();
        let expected: HashSet<u32> = (0..raw.len()).map(Record::row_for_index).collect();
        assert_eq!(rows, expected);
    }

    #[test]
    fn test_valid_rows_precede_invalid_rows() {
        let c = run(&[("x", "y"), ("-33.45", "-70.65"), ("", "")]);
        let order: Vec<u32> = c.results.iter().map(|r| r.row).collect();
        assert_eq!(order, vec![3, 2, 4]);
    }

    #[test]
    fn test_preview_is_sorted_by_row() {
        let raw: Vec<(String, String)> = (0..15)
            .map(|i| {
                if i % 3 == 0 {
                    ("bad".to_string(), "-70".to_string())
                } else {
                    ("-33.45".to_string(), "-70.65".to_string())
                }
            })
            .collect();
        let raw: Vec<(&str, &str)> = raw.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let c = run(&raw);

        let preview: Vec<u32> = c.preview(10).iter().map(|r| r.row).collect();
        assert_eq!(preview, (2..12).collect::<Vec<u32>>());
    }

    #[test]
    fn test_empty_input() {
        let c = run(&[]);
        assert!(c.results.is_empty());
        assert_eq!(c.total(), 0);
    }
}
