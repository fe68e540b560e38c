//! Geocode pipeline.
//!
//! Reads field coordinates from a worksheet, assigns each row to the
//! nearest territory of the boundary dataset, and writes region,
//! province and commune back in bulk.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::{Table, Tabled};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use territorio::boundary::BoundaryCache;
use territorio::config::Config;
use territorio::models::{ClassificationResult, Status};
use territorio::pipeline::{self, PipelineOptions, RunSummary};
use territorio::sheets::SheetsClient;

#[derive(Parser, Debug)]
#[command(name = "geocode")]
#[command(about = "Assign worksheet coordinates to region, province and commune")]
struct Args {
    /// Configuration file (defaults to ./territorio.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Spreadsheet ID
    #[arg(long)]
    sheet_id: Option<String>,

    /// Worksheet title
    #[arg(long)]
    worksheet: Option<String>,

    /// Boundary dataset: GeoJSON path or http(s) URL
    #[arg(long)]
    boundaries: Option<String>,

    /// Maximum centroid distance (degrees) to accept a match
    #[arg(long)]
    threshold: Option<f64>,

    /// Rows per bulk update
    #[arg(long)]
    batch_size: Option<usize>,

    /// Concurrent bulk updates
    #[arg(long)]
    workers: Option<usize>,

    /// Drop any cached copy of the boundary dataset before loading
    #[arg(long)]
    refresh_boundaries: bool,

    /// Classify and report without writing to the sheet
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    /// Apply command-line overrides on top of the file configuration
    fn apply(&self, config: &mut Config) {
        if let Some(id) = &self.sheet_id {
            config.sheet.spreadsheet_id = id.clone();
        }
        if let Some(ws) = &self.worksheet {
            config.sheet.worksheet = ws.clone();
        }
        if let Some(src) = &self.boundaries {
            config.boundaries.source = src.clone();
        }
        if let Some(t) = self.threshold {
            config.classify.threshold = t;
        }
        if let Some(n) = self.batch_size {
            config.writer.batch_size = n;
        }
        if let Some(n) = self.workers {
            config.writer.workers = n;
        }
    }
}

#[derive(Tabled)]
struct PreviewRow {
    #[tabled(rename = "Fila")]
    row: u32,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Provincia")]
    province: String,
    #[tabled(rename = "Comuna")]
    commune: String,
    #[tabled(rename = "Distancia")]
    distance: String,
}

impl From<&ClassificationResult> for PreviewRow {
    fn from(r: &ClassificationResult) -> Self {
        let distance = match r.status {
            Status::Matched { distance, .. } | Status::Outside { distance } => {
                format!("{:.4}", distance)
            }
            Status::Invalid => "-".to_string(),
        };
        Self {
            row: r.row,
            region: r.labels.region.clone(),
            province: r.labels.province.clone(),
            commune: r.labels.commune.clone(),
            distance,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Territorio Geocode");

    match run(args).await {
        Ok(summary) if summary.is_success() => Ok(ExitCode::SUCCESS),
        Ok(_) => Ok(ExitCode::FAILURE),
        Err(e) => {
            error!("Geocode failed: {:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(args: Args) -> Result<RunSummary> {
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let options = PipelineOptions {
        dry_run: args.dry_run,
        ..PipelineOptions::from_config(&config)?
    };

    // Boundaries
    let source = config.boundary_source();
    let mut cache = BoundaryCache::new(
        &config.boundaries.cache_dir,
        config.boundaries.properties.clone(),
    )?;
    if args.refresh_boundaries {
        cache.invalidate(&source)?;
    }
    let territories = cache
        .get(&source)
        .await
        .with_context(|| format!("Failed to load boundary dataset {}", source))?;

    // Sheet
    let token = config.access_token()?;
    let sheet = SheetsClient::new(&config.sheet.spreadsheet_id, &config.sheet.worksheet, &token)?;
    info!(
        "Spreadsheet {} / worksheet '{}'",
        sheet.spreadsheet_id(),
        config.sheet.worksheet
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(concat!(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] ",
                "{pos}/{len} rows ({per_sec})"
            ))?
            .progress_chars("#>-"),
    );

    let summary = pipeline::run(&sheet, &territories, &options, Some(pb.clone())).await?;
    pb.finish_and_clear();

    report(&summary);
    Ok(summary)
}

fn report(summary: &RunSummary) {
    info!("Total records: {}", summary.total);
    info!("Valid coordinates: {}", summary.valid);
    info!("Invalid coordinates: {}", summary.invalid);
    info!("Outside known territory: {}", summary.outside);

    match &summary.report {
        Some(report) if report.is_success() => {
            info!(
                "Wrote {} rows in {} batches",
                report.rows_written(),
                report.batches()
            );
        }
        Some(report) => {
            warn!(
                "{} of {} batches failed ({} rows not written); the sheet is partially updated",
                report.failed.len(),
                report.batches(),
                report.rows_failed()
            );
            for failure in &report.failed {
                error!(
                    "Batch {} ({} rows): {}",
                    failure.index,
                    failure.rows.len(),
                    failure.error
                );
            }
            return;
        }
        None => info!("Dry run: nothing written"),
    }

    let rows: Vec<PreviewRow> = summary.preview.iter().map(PreviewRow::from).collect();
    println!("{}", Table::new(rows));
}
