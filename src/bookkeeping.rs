//! Expense and income ledger kept in a worksheet keyed by date.
//!
//! Column A holds the date as `DD-MM-YYYY`; row 1 is a header. Expenses
//! live in columns E (name), F (product/service), G (price); income in
//! H (amount) and I (reason). A date that already has a row is updated in
//! place, parsed as typed input so prices and amounts stay numeric;
//! otherwise a new row is appended.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::info;

use crate::models::HEADER_ROWS;
use crate::sheets::{output_range, RangeUpdate, Worksheet};

pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Width of a freshly appended ledger row (A..I)
const ROW_WIDTH: usize = 9;

/// What an expense was spent on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Producto,
    Servicio,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Producto => write!(f, "Producto"),
            ItemKind::Servicio => write!(f, "Servicio"),
        }
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "producto" | "product" => Ok(ItemKind::Producto),
            "servicio" | "service" => Ok(ItemKind::Servicio),
            _ => Err(format!("Invalid kind: {}. Use: producto, servicio", s)),
        }
    }
}

/// Outcome of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Updated { row: u32 },
    Appended,
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

/// First data row whose column A equals `date` (exact text match)
pub async fn find_row_by_date(sheet: &dyn Worksheet, date: &str) -> Result<Option<u32>> {
    let dates = sheet.read_column("A").await?;
    Ok(dates
        .iter()
        .enumerate()
        .skip(HEADER_ROWS as usize)
        .find(|(_, value)| value.as_str() == date)
        .map(|(idx, _)| idx as u32 + 1))
}

/// Record an expense (columns E..G)
pub async fn upsert_expense(
    sheet: &dyn Worksheet,
    date: NaiveDate,
    name: &str,
    kind: ItemKind,
    price: &str,
) -> Result<Upsert> {
    let values = vec![name.to_string(), kind.to_string(), price.to_string()];
    upsert(sheet, date, 5, values).await
}

/// Record income (columns H..I)
pub async fn upsert_income(
    sheet: &dyn Worksheet,
    date: NaiveDate,
    amount: &str,
    reason: &str,
) -> Result<Upsert> {
    let values = vec![amount.to_string(), reason.to_string()];
    upsert(sheet, date, 8, values).await
}

/// Write `values` from 1-based `column` on the row for `date`
async fn upsert(
    sheet: &dyn Worksheet,
    date: NaiveDate,
    column: usize,
    values: Vec<String>,
) -> Result<Upsert> {
    let date = format_date(date);

    match find_row_by_date(sheet, &date).await? {
        Some(row) => {
            let range = output_range(sheet.title(), column, values.len(), row);
            sheet
                .batch_update_entered(&[RangeUpdate {
                    range,
                    values: vec![values],
                }])
                .await?;
            info!("Updated {} at row {} of {}", date, row, sheet.title());
            Ok(Upsert::Updated { row })
        }
        None => {
            let mut row = vec![String::new(); ROW_WIDTH];
            row[0] = date.clone();
            for (offset, value) in values.into_iter().enumerate() {
                row[column - 1 + offset] = value;
            }
            sheet.append_row(&row).await?;
            info!("Appended new row for {}", date);
            Ok(Upsert::Appended)
        }
    }
}
