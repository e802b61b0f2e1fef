//! Spreadsheet store contract
//!
//! The annotator treats the remote spreadsheet as a generic row store made of
//! named worksheets. Two backends implement [`Spreadsheet`]:
//! - [`GoogleSheetsClient`]: Google Sheets REST v4 over HTTP
//! - [`MemorySpreadsheet`]: in-process store for tests and local runs
//!
//! Rows are written as JSON values (strings, numbers, or null for an empty
//! cell) and read back as the strings the store displays.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[cfg(feature = "google")]
mod google;
mod memory;

#[cfg(feature = "google")]
pub use google::{GoogleAuth, GoogleSheetsClient, GoogleSheetsConfig, SPREADSHEETS_SCOPE};
pub use memory::MemorySpreadsheet;

/// Spreadsheet store errors
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Worksheet not found: {0}")]
    WorksheetNotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store configuration error: {0}")]
    Config(String),
}

/// Result type for store operations
pub type SheetResult<T> = std::result::Result<T, SheetError>;

/// Handle to one worksheet (tab) of a spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    /// Tab title, unique within the spreadsheet
    pub title: String,
    /// Store-assigned numeric id (Google `sheetId`)
    pub sheet_id: i64,
}

/// A single row of cell values to write
pub type RowValues = Vec<Value>;

/// Spreadsheet operations used by the annotator
///
/// Column and row indices are 1-based, matching the A1 notation of the
/// underlying store.
#[async_trait]
pub trait Spreadsheet: Send + Sync {
    /// Look up a worksheet by exact title
    ///
    /// Returns [`SheetError::WorksheetNotFound`] if no tab has this title.
    async fn worksheet(&self, title: &str) -> SheetResult<Worksheet>;

    /// Create a new worksheet with the given grid size
    async fn add_worksheet(&self, title: &str, rows: u32, cols: u32) -> SheetResult<Worksheet>;

    /// All non-trailing values of one column, top to bottom
    async fn col_values(&self, worksheet: &Worksheet, column: u32) -> SheetResult<Vec<String>>;

    /// Every populated row; row 0 is the first sheet row
    async fn get_all_values(&self, worksheet: &Worksheet) -> SheetResult<Vec<Vec<String>>>;

    /// Insert `values` as a new row at `index`, shifting later rows down
    async fn insert_row(
        &self,
        worksheet: &Worksheet,
        values: RowValues,
        index: u32,
    ) -> SheetResult<()>;

    /// Append rows after the last populated row
    async fn append_rows(&self, worksheet: &Worksheet, rows: Vec<RowValues>) -> SheetResult<()>;
}

/// Render a cell value the way the store displays it when read back
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        other => other.to_string(),
    }
}

/// Quote a worksheet title for use in an A1 range (`'It''s'`)
pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}
