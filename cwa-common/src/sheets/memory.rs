//! In-memory spreadsheet backend
//!
//! Mirrors the read-back behaviour of Google Sheets closely enough for the
//! annotator: trailing empty cells are trimmed from rows, and trailing empty
//! rows are not returned.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{display_value, RowValues, SheetError, SheetResult, Spreadsheet, Worksheet};

#[derive(Debug)]
struct MemoryWorksheet {
    handle: Worksheet,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    worksheets: Vec<MemoryWorksheet>,
    next_sheet_id: i64,
    unavailable: bool,
}

impl MemoryState {
    fn check_available(&self) -> SheetResult<()> {
        if self.unavailable {
            return Err(SheetError::Network("memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    fn find_mut(&mut self, worksheet: &Worksheet) -> SheetResult<&mut MemoryWorksheet> {
        self.worksheets
            .iter_mut()
            .find(|ws| ws.handle.sheet_id == worksheet.sheet_id)
            .ok_or_else(|| SheetError::WorksheetNotFound(worksheet.title.clone()))
    }
}

/// Spreadsheet held entirely in process memory
#[derive(Debug, Default)]
pub struct MemorySpreadsheet {
    state: Mutex<MemoryState>,
}

impl MemorySpreadsheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a worksheet pre-filled with rows (test and demo seeding)
    pub async fn seed_worksheet(&self, title: &str, rows: Vec<Vec<String>>) -> Worksheet {
        let mut state = self.state.lock().await;
        let handle = Worksheet {
            title: title.to_string(),
            sheet_id: state.next_sheet_id,
        };
        state.next_sheet_id += 1;
        state.worksheets.push(MemoryWorksheet {
            handle: handle.clone(),
            rows,
        });
        handle
    }

    /// Simulate an unreachable store: every later call fails with a network error
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Titles of all worksheets, in creation order
    pub async fn worksheet_titles(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .worksheets
            .iter()
            .map(|ws| ws.handle.title.clone())
            .collect()
    }

    /// Raw rows of a worksheet, or `None` if it does not exist
    pub async fn rows(&self, title: &str) -> Option<Vec<Vec<String>>> {
        self.state
            .lock()
            .await
            .worksheets
            .iter()
            .find(|ws| ws.handle.title == title)
            .map(|ws| ws.rows.clone())
    }
}

fn to_display_row(values: &RowValues) -> Vec<String> {
    let mut row: Vec<String> = values.iter().map(display_value).collect();
    while row.last().is_some_and(|cell| cell.is_empty()) {
        row.pop();
    }
    row
}

#[async_trait]
impl Spreadsheet for MemorySpreadsheet {
    async fn worksheet(&self, title: &str) -> SheetResult<Worksheet> {
        let state = self.state.lock().await;
        state.check_available()?;
        state
            .worksheets
            .iter()
            .find(|ws| ws.handle.title == title)
            .map(|ws| ws.handle.clone())
            .ok_or_else(|| SheetError::WorksheetNotFound(title.to_string()))
    }

    async fn add_worksheet(&self, title: &str, _rows: u32, _cols: u32) -> SheetResult<Worksheet> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        if state.worksheets.iter().any(|ws| ws.handle.title == title) {
            return Err(SheetError::Api {
                status: 400,
                message: format!("A sheet with the name \"{}\" already exists", title),
            });
        }
        let handle = Worksheet {
            title: title.to_string(),
            sheet_id: state.next_sheet_id,
        };
        state.next_sheet_id += 1;
        state.worksheets.push(MemoryWorksheet {
            handle: handle.clone(),
            rows: Vec::new(),
        });
        Ok(handle)
    }

    async fn col_values(&self, worksheet: &Worksheet, column: u32) -> SheetResult<Vec<String>> {
        if column == 0 {
            return Err(SheetError::Parse("column index is 1-based".to_string()));
        }
        let mut state = self.state.lock().await;
        state.check_available()?;
        let ws = state.find_mut(worksheet)?;
        let idx = (column - 1) as usize;
        let mut values: Vec<String> = ws
            .rows
            .iter()
            .map(|row| row.get(idx).cloned().unwrap_or_default())
            .collect();
        while values.last().is_some_and(|cell| cell.is_empty()) {
            values.pop();
        }
        Ok(values)
    }

    async fn get_all_values(&self, worksheet: &Worksheet) -> SheetResult<Vec<Vec<String>>> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let ws = state.find_mut(worksheet)?;
        let mut rows = ws.rows.clone();
        while rows.last().is_some_and(|row| row.is_empty()) {
            rows.pop();
        }
        Ok(rows)
    }

    async fn insert_row(
        &self,
        worksheet: &Worksheet,
        values: RowValues,
        index: u32,
    ) -> SheetResult<()> {
        if index == 0 {
            return Err(SheetError::Parse("row index is 1-based".to_string()));
        }
        let mut state = self.state.lock().await;
        state.check_available()?;
        let ws = state.find_mut(worksheet)?;
        let at = (index - 1) as usize;
        while ws.rows.len() < at {
            ws.rows.push(Vec::new());
        }
        ws.rows.insert(at, to_display_row(&values));
        Ok(())
    }

    async fn append_rows(&self, worksheet: &Worksheet, rows: Vec<RowValues>) -> SheetResult<()> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let ws = state.find_mut(worksheet)?;
        while ws.rows.last().is_some_and(|row| row.is_empty()) {
            ws.rows.pop();
        }
        ws.rows.extend(rows.iter().map(to_display_row));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_missing_worksheet_is_not_found() {
        let store = MemorySpreadsheet::new();
        let err = store.worksheet("nobody").await.unwrap_err();
        assert!(matches!(err, SheetError::WorksheetNotFound(title) if title == "nobody"));
    }

    #[tokio::test]
    async fn test_add_worksheet_rejects_duplicate_title() {
        let store = MemorySpreadsheet::new();
        store.add_worksheet("anna", 1000, 12).await.unwrap();
        let err = store.add_worksheet("anna", 1000, 12).await.unwrap_err();
        assert!(matches!(err, SheetError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_append_trims_trailing_empty_cells() {
        let store = MemorySpreadsheet::new();
        let ws = store.add_worksheet("anna", 1000, 12).await.unwrap();
        store
            .append_rows(&ws, vec![vec![json!("a"), json!(1), Value::Null, json!("")]])
            .await
            .unwrap();

        let rows = store.get_all_values(&ws).await.unwrap();
        assert_eq!(rows, vec![vec!["a".to_string(), "1".to_string()]]);
    }

    #[tokio::test]
    async fn test_insert_row_shifts_existing_rows() {
        let store = MemorySpreadsheet::new();
        let ws = store
            .seed_worksheet("anna", vec![vec!["data".to_string()]])
            .await;
        store.insert_row(&ws, vec![json!("header")], 1).await.unwrap();

        let rows = store.get_all_values(&ws).await.unwrap();
        assert_eq!(rows[0], vec!["header".to_string()]);
        assert_eq!(rows[1], vec!["data".to_string()]);
    }

    #[tokio::test]
    async fn test_col_values_reads_first_column() {
        let store = MemorySpreadsheet::new();
        let ws = store
            .seed_worksheet(
                "allowed",
                vec![
                    vec!["anna".to_string(), "x".to_string()],
                    vec!["bo".to_string()],
                    vec![],
                ],
            )
            .await;

        assert_eq!(store.col_values(&ws, 1).await.unwrap(), vec!["anna", "bo"]);
        assert_eq!(store.col_values(&ws, 2).await.unwrap(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_with_network_error() {
        let store = MemorySpreadsheet::new();
        store.set_unavailable(true).await;
        let err = store.worksheet("anything").await.unwrap_err();
        assert!(matches!(err, SheetError::Network(_)));
    }
}
