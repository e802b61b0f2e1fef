//! Ledger row model

use cwa_common::sheets::RowValues;
use serde::Serialize;
use serde_json::{json, Value};

/// Column names of a per-user ledger sheet, in row order
pub const LEDGER_HEADER: [&str; 8] = [
    "user_id",
    "text_index",
    "full_text",
    "debate_unit_id",
    "check_worthy",
    "other",
    "comment_field",
    "timestamp",
];

/// Zero-based position of `full_text` within [`LEDGER_HEADER`]
pub const FULL_TEXT_COLUMN: usize = 2;

/// One submitted annotation, persisted as one ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationRecord {
    pub user_id: String,
    /// Cursor into the user's unannotated sequence at capture time
    pub text_index: usize,
    /// Exact corpus line; dedup key
    pub full_text: String,
    pub debate_unit_id: Option<u64>,
    pub check_worthy: String,
    pub other: String,
    pub comment_field: String,
    /// `YYYY-MM-DD HH:MM:SS`, local time
    pub timestamp: String,
}

impl AnnotationRecord {
    /// Cell values in [`LEDGER_HEADER`] order
    ///
    /// Integers are written as numbers; a missing unit id leaves the cell empty.
    pub fn to_row(&self) -> RowValues {
        vec![
            json!(self.user_id),
            json!(self.text_index),
            json!(self.full_text),
            self.debate_unit_id.map_or(Value::Null, |id| json!(id)),
            json!(self.check_worthy),
            json!(self.other),
            json!(self.comment_field),
            json!(self.timestamp),
        ]
    }
}

/// Header row as cell values
pub fn header_row() -> RowValues {
    LEDGER_HEADER.iter().map(|name| json!(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(unit_id: Option<u64>) -> AnnotationRecord {
        AnnotationRecord {
            user_id: "anna".to_string(),
            text_index: 3,
            full_text: "[7] **A:** text".to_string(),
            debate_unit_id: unit_id,
            check_worthy: "x; y".to_string(),
            other: String::new(),
            comment_field: "usikker".to_string(),
            timestamp: "2025-03-07 09:05:01".to_string(),
        }
    }

    #[test]
    fn test_row_matches_header_width_and_order() {
        let row = record(Some(7)).to_row();
        assert_eq!(row.len(), LEDGER_HEADER.len());
        assert_eq!(row[0], json!("anna"));
        assert_eq!(row[1], json!(3));
        assert_eq!(row[FULL_TEXT_COLUMN], json!("[7] **A:** text"));
        assert_eq!(row[3], json!(7));
        assert_eq!(row[4], json!("x; y"));
        assert_eq!(row[7], json!("2025-03-07 09:05:01"));
    }

    #[test]
    fn test_missing_unit_id_is_empty_cell() {
        let row = record(None).to_row();
        assert_eq!(row[3], Value::Null);
    }

    #[test]
    fn test_header_row() {
        let header = header_row();
        assert_eq!(header.len(), 8);
        assert_eq!(header[FULL_TEXT_COLUMN], json!("full_text"));
    }
}
