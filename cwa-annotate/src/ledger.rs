//! Per-user ledger: one worksheet per annotator, titled with the user id
//!
//! Row 1 is the fixed header; every later row is one [`AnnotationRecord`].

use std::collections::HashSet;
use std::sync::Arc;

use cwa_common::sheets::{SheetError, SheetResult, Spreadsheet, Worksheet};

use crate::models::{header_row, AnnotationRecord, FULL_TEXT_COLUMN};

/// Grid size of a newly created ledger sheet
pub const LEDGER_SHEET_ROWS: u32 = 1000;
pub const LEDGER_SHEET_COLS: u32 = 12;

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Spreadsheet>,
}

impl Ledger {
    pub fn new(store: Arc<dyn Spreadsheet>) -> Self {
        Self { store }
    }

    /// Find the user's sheet, creating it with the header row if absent
    ///
    /// An existing sheet is returned untouched.
    pub async fn get_or_create_user_sheet(&self, user_id: &str) -> SheetResult<Worksheet> {
        match self.store.worksheet(user_id).await {
            Ok(worksheet) => Ok(worksheet),
            Err(SheetError::WorksheetNotFound(_)) => {
                let worksheet = match self
                    .store
                    .add_worksheet(user_id, LEDGER_SHEET_ROWS, LEDGER_SHEET_COLS)
                    .await
                {
                    Ok(worksheet) => worksheet,
                    // Lost a creation race; the winner writes the header
                    Err(add_err @ SheetError::Api { .. }) => {
                        return self.store.worksheet(user_id).await.map_err(|_| add_err);
                    }
                    Err(e) => return Err(e),
                };
                self.store.insert_row(&worksheet, header_row(), 1).await?;
                tracing::info!(user_id = %user_id, "Created ledger sheet");
                Ok(worksheet)
            }
            Err(e) => Err(e),
        }
    }

    /// `full_text` of every saved annotation
    ///
    /// A user without a sheet yet has annotated nothing.
    pub async fn get_annotated_texts(&self, user_id: &str) -> SheetResult<HashSet<String>> {
        let worksheet = match self.store.worksheet(user_id).await {
            Ok(worksheet) => worksheet,
            Err(SheetError::WorksheetNotFound(_)) => return Ok(HashSet::new()),
            Err(e) => return Err(e),
        };

        let rows = self.store.get_all_values(&worksheet).await?;
        let texts: HashSet<String> = rows
            .into_iter()
            .skip(1)
            .filter_map(|mut row| {
                if row.len() > FULL_TEXT_COLUMN {
                    Some(row.swap_remove(FULL_TEXT_COLUMN))
                } else {
                    None
                }
            })
            .filter(|text| !text.is_empty())
            .collect();

        tracing::debug!(user_id = %user_id, annotated = texts.len(), "Loaded annotated texts");
        Ok(texts)
    }

    /// Append records after the last row; not atomic across rows
    pub async fn append_annotations(
        &self,
        user_id: &str,
        records: &[AnnotationRecord],
    ) -> SheetResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let worksheet = self.get_or_create_user_sheet(user_id).await?;
        let rows = records.iter().map(AnnotationRecord::to_row).collect();
        self.store.append_rows(&worksheet, rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LEDGER_HEADER;
    use cwa_common::sheets::MemorySpreadsheet;

    fn record(user_id: &str, text: &str) -> AnnotationRecord {
        AnnotationRecord {
            user_id: user_id.to_string(),
            text_index: 0,
            full_text: text.to_string(),
            debate_unit_id: Some(1),
            check_worthy: "x".to_string(),
            other: String::new(),
            comment_field: String::new(),
            timestamp: "2025-01-01 00:00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = Arc::new(MemorySpreadsheet::new());
        let ledger = Ledger::new(store.clone());

        let first = ledger.get_or_create_user_sheet("anna").await.unwrap();
        let second = ledger.get_or_create_user_sheet("anna").await.unwrap();
        assert_eq!(first, second);

        assert_eq!(store.worksheet_titles().await, vec!["anna"]);
        let rows = store.rows("anna").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], LEDGER_HEADER.map(String::from).to_vec());
    }

    #[tokio::test]
    async fn test_existing_sheet_is_not_overwritten() {
        let store = Arc::new(MemorySpreadsheet::new());
        store
            .seed_worksheet("anna", vec![vec!["custom".to_string()], vec!["data".to_string()]])
            .await;
        let ledger = Ledger::new(store.clone());

        ledger.get_or_create_user_sheet("anna").await.unwrap();
        let rows = store.rows("anna").await.unwrap();
        assert_eq!(rows, vec![vec!["custom".to_string()], vec!["data".to_string()]]);
    }

    #[tokio::test]
    async fn test_annotated_texts_empty_without_sheet_or_rows() {
        let store = Arc::new(MemorySpreadsheet::new());
        let ledger = Ledger::new(store.clone());
        assert!(ledger.get_annotated_texts("anna").await.unwrap().is_empty());

        ledger.get_or_create_user_sheet("anna").await.unwrap();
        assert!(ledger.get_annotated_texts("anna").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_then_read_back_texts() {
        let store = Arc::new(MemorySpreadsheet::new());
        let ledger = Ledger::new(store.clone());

        ledger
            .append_annotations("anna", &[record("anna", "[1] a"), record("anna", "[2] b")])
            .await
            .unwrap();

        let texts = ledger.get_annotated_texts("anna").await.unwrap();
        assert_eq!(texts.len(), 2);
        assert!(texts.contains("[1] a"));
        assert!(texts.contains("[2] b"));
        // header + 2 rows
        assert_eq!(store.rows("anna").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_append_nothing_creates_nothing() {
        let store = Arc::new(MemorySpreadsheet::new());
        let ledger = Ledger::new(store.clone());
        ledger.append_annotations("anna", &[]).await.unwrap();
        assert!(store.worksheet_titles().await.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(MemorySpreadsheet::new());
        store.set_unavailable(true).await;
        let ledger = Ledger::new(store);
        assert!(matches!(
            ledger.get_annotated_texts("anna").await,
            Err(SheetError::Network(_))
        ));
    }
}
