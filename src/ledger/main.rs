//! Expense and income ledger.
//!
//! Records one expense or income entry against the row of a given date,
//! appending a new row when the date is not in the sheet yet.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use territorio::bookkeeping::{self, ItemKind, Upsert};
use territorio::config::Config;
use territorio::sheets::SheetsClient;

#[derive(Parser, Debug)]
#[command(name = "ledger")]
#[command(about = "Record expenses and income in the ledger worksheet")]
struct Args {
    /// Configuration file (defaults to ./territorio.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Spreadsheet ID
    #[arg(long, global = true)]
    sheet_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record an expense in columns E..G
    Expense {
        /// Date as DD-MM-YYYY (defaults to today)
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        #[arg(short, long)]
        name: String,

        /// producto or servicio
        #[arg(short, long)]
        kind: ItemKind,

        #[arg(short, long)]
        price: String,
    },
    /// Record income in columns H..I
    Income {
        /// Date as DD-MM-YYYY (defaults to today)
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        #[arg(short, long)]
        amount: String,

        #[arg(short, long)]
        reason: String,
    },
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    bookkeeping::parse_date(s).map_err(|e| format!("expected DD-MM-YYYY: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(id) = &args.sheet_id {
        config.sheet.spreadsheet_id = id.clone();
    }
    if config.sheet.spreadsheet_id.trim().is_empty() {
        anyhow::bail!("No spreadsheet configured; pass --sheet-id or set sheet.spreadsheet_id");
    }

    let token = config.access_token()?;
    let sheet = SheetsClient::new(&config.sheet.spreadsheet_id, &config.ledger.worksheet, &token)?;
    let today = Local::now().date_naive();

    let outcome = match args.command {
        Command::Expense {
            date,
            name,
            kind,
            price,
        } => bookkeeping::upsert_expense(&sheet, date.unwrap_or(today), &name, kind, &price)
            .await
            .context("Failed to record expense")?,
        Command::Income {
            date,
            amount,
            reason,
        } => bookkeeping::upsert_income(&sheet, date.unwrap_or(today), &amount, &reason)
            .await
            .context("Failed to record income")?,
    };

    match outcome {
        Upsert::Updated { row } => info!("Row {} updated", row),
        Upsert::Appended => info!("New row appended"),
    }

    Ok(())
}
