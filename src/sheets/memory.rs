//! In-memory worksheet for offline runs and tests.

use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::worksheet::{column_index, parse_cell, RangeUpdate, Worksheet};

/// A worksheet held as a grid of strings
pub struct MemorySheet {
    title: String,
    grid: Mutex<Vec<Vec<String>>>,
}

impl MemorySheet {
    pub fn new(title: &str, rows: Vec<Vec<String>>) -> Self {
        Self {
            title: title.to_string(),
            grid: Mutex::new(rows),
        }
    }

    /// Current contents
    pub fn snapshot(&self) -> Vec<Vec<String>> {
        self.lock().clone()
    }

    /// Value at a 1-based (row, column), empty when outside the grid
    pub fn cell(&self, row: u32, column: usize) -> String {
        self.lock()
            .get(row as usize - 1)
            .and_then(|r| r.get(column - 1))
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<String>>> {
        // A panic while holding the lock leaves plain data behind; keep using it
        self.grid.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set(grid: &mut Vec<Vec<String>>, row: u32, column: usize, value: String) {
        let r = row as usize - 1;
        if grid.len() <= r {
            grid.resize(r + 1, Vec::new());
        }
        let cells = &mut grid[r];
        if cells.len() < column {
            cells.resize(column, String::new());
        }
        cells[column - 1] = value;
    }
}

#[async_trait]
impl Worksheet for MemorySheet {
    fn title(&self) -> &str {
        &self.title
    }

    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        Ok(self.snapshot())
    }

    async fn read_column(&self, column: &str) -> Result<Vec<String>> {
        let idx = column_index(column).with_context(|| format!("Bad column '{}'", column))?;
        Ok(self
            .lock()
            .iter()
            .map(|r| r.get(idx - 1).cloned().unwrap_or_default())
            .collect())
    }

    async fn batch_update(&self, updates: &[RangeUpdate]) -> Result<()> {
        let mut grid = self.lock();
        for update in updates {
            let cells = update
                .range
                .rsplit_once('!')
                .map_or(update.range.as_str(), |(_, cells)| cells);
            let start = cells.split(':').next().unwrap_or(cells);
            let (column, row) =
                parse_cell(start).with_context(|| format!("Bad range '{}'", update.range))?;

            for (dr, values) in update.values.iter().enumerate() {
                for (dc, value) in values.iter().enumerate() {
                    Self::set(&mut grid, row + dr as u32, column + dc, value.clone());
                }
            }
        }
        Ok(())
    }

    async fn append_row(&self, values: &[String]) -> Result<()> {
        let mut grid = self.lock();
        while grid
            .last()
            .map_or(false, |r| r.iter().all(|c| c.is_empty()))
        {
            grid.pop();
        }
        grid.push(values.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> MemorySheet {
        MemorySheet::new(
            "Datos",
            vec![
                vec!["Fecha".to_string(), "Nombre".to_string()],
                vec!["01-01-2024".to_string()],
            ],
        )
    }

    #[tokio::test]
    async fn test_batch_update_grows_grid() {
        let sheet = sheet();
        sheet
            .batch_update(&[RangeUpdate {
                range: "Datos!H4:J4".to_string(),
                values: vec![vec!["a".into(), "b".into(), "c".into()]],
            }])
            .await
            .unwrap();

        assert_eq!(sheet.cell(4, 8), "a");
        assert_eq!(sheet.cell(4, 10), "c");
        assert_eq!(sheet.cell(3, 8), "");
        assert_eq!(sheet.snapshot().len(), 4);
    }

    #[tokio::test]
    async fn test_read_column_keeps_positions() {
        let sheet = sheet();
        assert_eq!(
            sheet.read_column("B").await.unwrap(),
            vec!["Nombre".to_string(), String::new()]
        );
    }

    #[tokio::test]
    async fn test_append_goes_after_last_row() {
        let sheet = sheet();
        sheet.append_row(&["02-01-2024".to_string()]).await.unwrap();
        assert_eq!(sheet.cell(3, 1), "02-01-2024");
    }

    #[tokio::test]
    async fn test_bad_range_is_an_error() {
        let sheet = sheet();
        let res = sheet
            .batch_update(&[RangeUpdate {
                range: "Datos!nope".to_string(),
                values: vec![],
            }])
            .await;
        assert!(res.is_err());
    }
}
