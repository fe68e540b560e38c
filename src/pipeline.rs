//! End-to-end geocode run: read rows, classify, write labels back.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use tracing::info;

use crate::boundary::BoundaryIndex;
use crate::classify::classify;
use crate::config::Config;
use crate::models::{ClassificationResult, TerritorySet};
use crate::sheets::{records_from_rows, ResultWriter, Worksheet, WriteReport};

/// Rows shown back to the user after a run
pub const PREVIEW_ROWS: usize = 10;

/// Knobs for one run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub latitude_column: String,
    pub longitude_column: String,
    /// 1-based first output column
    pub output_column: usize,
    pub threshold: f64,
    pub batch_size: usize,
    pub workers: usize,
    /// Classify without writing anything back
    pub dry_run: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            latitude_column: config.sheet.latitude_column.clone(),
            longitude_column: config.sheet.longitude_column.clone(),
            output_column: config.output_column_index()?,
            threshold: config.classify.threshold,
            batch_size: config.writer.batch_size,
            workers: config.writer.workers,
            dry_run: false,
        })
    }
}

/// What the user is told after a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub outside: usize,
    /// First rows by sheet position
    pub preview: Vec<ClassificationResult>,
    /// `None` on a dry run
    pub report: Option<WriteReport>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.report.as_ref().map_or(true, WriteReport::is_success)
    }
}

/// Run the whole pipeline against one worksheet.
///
/// The boundary index is built here, once, and dropped when the run ends.
/// Classification finishes before any write is issued.
pub async fn run(
    sheet: &dyn Worksheet,
    territories: &TerritorySet,
    options: &PipelineOptions,
    progress: Option<ProgressBar>,
) -> Result<RunSummary> {
    let index = BoundaryIndex::build(territories)?;

    info!("Reading rows from worksheet '{}'", sheet.title());
    let rows = sheet
        .read_all_rows()
        .await
        .context("Failed to read worksheet rows")?;

    let records = records_from_rows(rows, &options.latitude_column, &options.longitude_column)?;
    info!("Read {} records", records.len());

    let classification = classify(&records, &index, territories, options.threshold)?;
    info!(
        "Total: {}, valid coordinates: {}, invalid: {}, outside territory: {}",
        classification.total(),
        classification.valid,
        classification.invalid,
        classification.outside()
    );

    let report = if options.dry_run {
        info!("Dry run, skipping write-back");
        None
    } else {
        let mut writer = ResultWriter::new(sheet, options.output_column)
            .batch_size(options.batch_size)
            .workers(options.workers);
        if let Some(pb) = progress {
            pb.set_length(classification.results.len() as u64);
            writer = writer.progress(pb);
        }
        Some(writer.write(&classification.results).await)
    };

    Ok(RunSummary {
        total: classification.total(),
        valid: classification.valid,
        invalid: classification.invalid,
        outside: classification.outside(),
        preview: classification
            .preview(PREVIEW_ROWS)
            .into_iter()
            .cloned()
            .collect(),
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Labels, Territory, NA, OTROS};
    use crate::sheets::MemorySheet;
    use geo::{MultiPolygon, Rect};

    fn square(cx: f64, cy: f64, half: f64) -> MultiPolygon<f64> {
        let rect = Rect::new((cx - half, cy - half), (cx + half, cy + half));
        MultiPolygon::new(vec![rect.to_polygon()])
    }

    fn territories() -> TerritorySet {
        TerritorySet::new(
            "test",
            vec![
                Territory::new(
                    Labels::new("Metropolitana", "Santiago", "Santiago"),
                    square(-70.65, -33.45, 0.2),
                ),
                Territory::new(
                    Labels::new("Valparaiso", "Valparaiso", "Valparaiso"),
                    square(-71.6, -33.0, 0.2),
                ),
            ],
        )
    }

    fn sheet() -> MemorySheet {
        let row = |cells: &[&str]| cells.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        MemorySheet::new(
            "Datos",
            vec![
                row(&["Nombre", "Latitud campo", "Longitud Campo"]),
                row(&["a", "-33,45", "-70,65"]),
                row(&["b", "-3345000000", "-7065000000"]),
                row(&["c", "abc", "-70"]),
                row(&["d", "10", "10"]),
                row(&["e", "-33.0", "-71.6"]),
            ],
        )
    }

    fn options() -> PipelineOptions {
        PipelineOptions {
            latitude_column: "Latitud campo".to_string(),
            longitude_column: "Longitud Campo".to_string(),
            output_column: 8,
            threshold: 1.0,
            batch_size: 2,
            workers: 4,
            dry_run: false,
        }
    }

    fn labels_at(sheet: &MemorySheet, row: u32) -> Vec<String> {
        (8..=10).map(|col| sheet.cell(row, col)).collect()
    }

    #[tokio::test]
    async fn test_run_writes_labels_next_to_each_row() {
        let sheet = sheet();
        let summary = run(&sheet, &territories(), &options(), None).await.unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.valid, 4);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.outside, 1);
        assert!(summary.is_success());

        let report = summary.report.unwrap();
        assert_eq!(report.rows_written(), 5);
        assert_eq!(report.batches(), 3);

        assert_eq!(labels_at(&sheet, 2), vec!["Metropolitana", "Santiago", "Santiago"]);
        assert_eq!(labels_at(&sheet, 3), vec!["Metropolitana", "Santiago", "Santiago"]);
        assert_eq!(labels_at(&sheet, 4), vec![NA, NA, NA]);
        assert_eq!(labels_at(&sheet, 5), vec![OTROS, OTROS, OTROS]);
        assert_eq!(labels_at(&sheet, 6), vec!["Valparaiso", "Valparaiso", "Valparaiso"]);

        // Input columns untouched
        assert_eq!(sheet.cell(4, 2), "abc");
        assert_eq!(sheet.cell(1, 8), "");
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let sheet = sheet();
        let before = sheet.snapshot();
        let opts = PipelineOptions {
            dry_run: true,
            ..options()
        };
        let summary = run(&sheet, &territories(), &opts, None).await.unwrap();

        assert!(summary.report.is_none());
        assert!(summary.is_success());
        assert_eq!(sheet.snapshot(), before);
    }

    #[tokio::test]
    async fn test_preview_follows_sheet_order() {
        let sheet = sheet();
        let summary = run(&sheet, &territories(), &options(), None).await.unwrap();

        // Invalid rows are classified last but previewed in place
        let rows: Vec<u32> = summary.preview.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_missing_coordinate_column_fails_before_writing() {
        let sheet = MemorySheet::new(
            "Datos",
            vec![vec!["Latitud campo".to_string()], vec!["-33".to_string()]],
        );
        let res = run(&sheet, &territories(), &options(), None).await;

        assert!(res.is_err());
        assert_eq!(sheet.cell(2, 8), "");
    }

    #[tokio::test]
    async fn test_empty_boundary_dataset_is_an_error() {
        let sheet = sheet();
        let empty = TerritorySet::new("empty", Vec::new());
        assert!(run(&sheet, &empty, &options(), None).await.is_err());
    }
}
