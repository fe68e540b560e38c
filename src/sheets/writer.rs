//! Bulk write-back of classification results.

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{debug, error, info};

use super::worksheet::{output_range, RangeUpdate, Worksheet};
use crate::models::ClassificationResult;

/// Rows per bulk request
pub const DEFAULT_BATCH_SIZE: usize = 1000;
/// Bulk requests in flight at once
pub const DEFAULT_WORKERS: usize = 4;
/// Region, province, commune
const OUTPUT_WIDTH: usize = 3;

/// One bulk request worth of rows
#[derive(Debug, Clone, PartialEq)]
pub struct WriteBatch {
    /// Position of the batch in submission order
    pub index: usize,
    /// Sheet rows covered, in result order
    pub rows: Vec<u32>,
    pub updates: Vec<RangeUpdate>,
}

/// A batch that landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub index: usize,
    pub rows: usize,
}

/// A batch that did not land
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub index: usize,
    pub rows: Vec<u32>,
    pub error: String,
}

/// Per-batch result of a write run. Batches that landed before a failure
/// are not rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub succeeded: Vec<BatchOutcome>,
    pub failed: Vec<BatchFailure>,
}

impl WriteReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn rows_written(&self) -> usize {
        self.succeeded.iter().map(|b| b.rows).sum()
    }

    pub fn rows_failed(&self) -> usize {
        self.failed.iter().map(|b| b.rows.len()).sum()
    }

    pub fn batches(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Split results into contiguous batches in result order (not row order)
pub fn plan_batches(
    results: &[ClassificationResult],
    title: &str,
    start_column: usize,
    batch_size: usize,
) -> Vec<WriteBatch> {
    results
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, chunk)| WriteBatch {
            index,
            rows: chunk.iter().map(|r| r.row).collect(),
            updates: chunk
                .iter()
                .map(|r| RangeUpdate {
                    range: output_range(title, start_column, OUTPUT_WIDTH, r.row),
                    values: vec![r.labels.to_row()],
                })
                .collect(),
        })
        .collect()
}

/// Submits result batches through a bounded number of concurrent requests
pub struct ResultWriter<'a> {
    sheet: &'a dyn Worksheet,
    start_column: usize,
    batch_size: usize,
    workers: usize,
    progress: Option<ProgressBar>,
}

impl<'a> ResultWriter<'a> {
    /// Create a new writer targeting `start_column` (1-based) and the two after it
    pub fn new(sheet: &'a dyn Worksheet, start_column: usize) -> Self {
        Self {
            sheet,
            start_column,
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
            progress: None,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Advance `progress` by the row count of every finished batch
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Write every result. Never stops early: all batches are attempted and
    /// each outcome is recorded.
    pub async fn write(&self, results: &[ClassificationResult]) -> WriteReport {
        let batches = plan_batches(results, self.sheet.title(), self.start_column, self.batch_size);

        info!(
            "Writing {} rows in {} batches ({} workers)",
            results.len(),
            batches.len(),
            self.workers
        );

        let outcomes: Vec<(WriteBatch, anyhow::Result<()>)> = stream::iter(batches)
            .map(|batch| async move {
                let res = self.sheet.batch_update(&batch.updates).await;
                if let Some(pb) = &self.progress {
                    pb.inc(batch.rows.len() as u64);
                }
                (batch, res)
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut report = WriteReport::default();
        for (batch, res) in outcomes {
            match res {
                Ok(()) => {
                    debug!("Batch {} wrote {} rows", batch.index, batch.rows.len());
                    report.succeeded.push(BatchOutcome {
                        index: batch.index,
                        rows: batch.rows.len(),
                    });
                }
                Err(e) => {
                    error!("Batch {} failed: {:#}", batch.index, e);
                    report.failed.push(BatchFailure {
                        index: batch.index,
                        rows: batch.rows,
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        report.succeeded.sort_by_key(|b| b.index);
        report.failed.sort_by_key(|b| b.index);

        info!(
            "Wrote {} rows ({} failed batches)",
            report.rows_written(),
            report.failed.len()
        );

        report
    }
}
