//! Worksheet abstraction and A1-notation helpers.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::Record;

/// One range of a bulk values update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeUpdate {
    /// A1 range including the sheet title, e.g. `'Datos'!H2:J2`
    pub range: String,
    pub values: Vec<Vec<String>>,
}

/// A single worksheet of a spreadsheet
#[async_trait]
pub trait Worksheet: Send + Sync {
    /// Sheet title used in A1 ranges
    fn title(&self) -> &str;

    /// Every row, header included, as displayed text
    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>>;

    /// Every cell of one column (`"A"`, `"H"`, ...), header included
    async fn read_column(&self, column: &str) -> Result<Vec<String>>;

    /// Apply all updates in one request, values stored as given
    async fn batch_update(&self, updates: &[RangeUpdate]) -> Result<()>;

    /// Apply all updates in one request, values parsed as if typed into the
    /// sheet so numbers stay numeric
    async fn batch_update_entered(&self, updates: &[RangeUpdate]) -> Result<()> {
        self.batch_update(updates).await
    }

    /// Append a row after the last non-empty row
    async fn append_row(&self, values: &[String]) -> Result<()>;
}

/// 1-based column number to letters: 1 → `A`, 27 → `AA`
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Letters to 1-based column number, `None` for anything but ASCII letters
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |acc, c| {
        if c.is_ascii_alphabetic() {
            Some(acc * 26 + (c.to_ascii_uppercase() as u8 - b'A') as usize + 1)
        } else {
            None
        }
    })
}

/// Split an A1 cell reference into (1-based column, row): `H12` → (8, 12)
pub fn parse_cell(cell: &str) -> Option<(usize, u32)> {
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((column_index(letters)?, row))
}

/// Quote a sheet title for A1 notation; `2024` alone would read as a row
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Range covering `width` columns from `start` on one row: `'Datos'!H5:J5`
pub fn output_range(title: &str, start: usize, width: usize, row: u32) -> String {
    let first = column_letter(start);
    let last = column_letter(start + width.saturating_sub(1));
    format!("{}!{}{}:{}{}", quote_title(title), first, row, last, row)
}

/// Turn raw sheet rows (header first) into records.
///
/// Rows shorter than the header are padded with empty cells.
pub fn records_from_rows(
    rows: Vec<Vec<String>>,
    latitude_header: &str,
    longitude_header: &str,
) -> crate::error::Result<Vec<Record>> {
    let mut rows = rows.into_iter();
    let header = rows.next().unwrap_or_default();

    let position = |name: &str| {
        header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| Error::MissingColumn {
                column: name.to_string(),
            })
    };
    let lat_idx = position(latitude_header)?;
    let lon_idx = position(longitude_header)?;

    let records = rows
        .enumerate()
        .map(|(i, cells)| {
            let cell = |idx: usize| cells.get(idx).cloned().unwrap_or_default();

            let mut record = Record::new(Record::row_for_index(i), cell(lat_idx), cell(lon_idx));
            for (idx, name) in header.iter().enumerate() {
                if idx != lat_idx && idx != lon_idx && !name.is_empty() {
                    record.passthrough.insert(name.clone(), cell(idx));
                }
            }
            record
        })
        .collect();

    Ok(records)
}
