//! Annotation capture
//!
//! Turns what the selection widget submitted into an [`AnnotationRecord`].

pub mod format;

pub use format::{format_for_display, DisplayUnit};

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use cwa_common::time::{format_record_timestamp, local_now};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::AnnotationRecord;

/// Separator between spans sharing a label in one ledger cell
pub const SPAN_SEPARATOR: &str = "; ";

/// Label vocabulary offered by the selection widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "Bør faktatjekkes")]
    CheckWorthy,
    #[serde(rename = "Andet")]
    Other,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::CheckWorthy, Label::Other];

    /// Name shown on the widget and submitted back
    pub fn name(self) -> &'static str {
        match self {
            Label::CheckWorthy => "Bør faktatjekkes",
            Label::Other => "Andet",
        }
    }

    pub fn from_name(name: &str) -> Option<Label> {
        Label::ALL.into_iter().find(|label| label.name() == name)
    }
}

/// A substring of the displayed text tagged with one or more labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledSpan {
    pub text: String,
    pub labels: BTreeSet<Label>,
}

impl LabeledSpan {
    pub fn new(text: impl Into<String>, labels: impl IntoIterator<Item = Label>) -> Self {
        Self {
            text: text.into(),
            labels: labels.into_iter().collect(),
        }
    }

    pub fn has(&self, label: Label) -> bool {
        self.labels.contains(&label)
    }
}

/// Rejected widget submission
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("selection data is not valid JSON: {0}")]
    InvalidPayload(String),

    #[error("unknown label: {0}")]
    UnknownLabel(String),

    #[error("selection has no label: {0}")]
    Unlabeled(String),

    #[error("empty selection")]
    EmptySpan,

    #[error("selection does not occur in the displayed text: {0}")]
    NotInText(String),
}

#[derive(Debug, Deserialize)]
struct SubmittedSpan {
    text: String,
    #[serde(default)]
    labels: Vec<String>,
}

/// Browsers submit form text with CRLF line breaks; the display text uses LF
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Decode the spans the selection widget posted for `display_text`
///
/// `payload` is a JSON array of `{"text": ..., "labels": [...]}`; an empty
/// payload means nothing was selected.
pub fn capture_selections(
    display_text: &str,
    payload: &str,
) -> Result<Vec<LabeledSpan>, CaptureError> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }

    let submitted: Vec<SubmittedSpan> = serde_json::from_str(payload)
        .map_err(|e| CaptureError::InvalidPayload(e.to_string()))?;

    submitted
        .into_iter()
        .map(|span| {
            let text = normalize_newlines(&span.text);
            if text.trim().is_empty() {
                return Err(CaptureError::EmptySpan);
            }
            if !display_text.contains(&text) {
                return Err(CaptureError::NotInText(text));
            }
            let labels = span
                .labels
                .iter()
                .map(|name| Label::from_name(name).ok_or_else(|| CaptureError::UnknownLabel(name.clone())))
                .collect::<Result<BTreeSet<_>, _>>()?;
            if labels.is_empty() {
                return Err(CaptureError::Unlabeled(text));
            }
            Ok(LabeledSpan { text, labels })
        })
        .collect()
}

/// Join the texts of all spans carrying `label`
pub fn join_label(spans: &[LabeledSpan], label: Label) -> String {
    spans
        .iter()
        .filter(|span| span.has(label))
        .map(|span| span.text.as_str())
        .collect::<Vec<_>>()
        .join(SPAN_SEPARATOR)
}

/// Group span texts by label for the selection summary
pub fn group_by_label(spans: &[LabeledSpan]) -> Vec<(Label, Vec<&str>)> {
    Label::ALL
        .into_iter()
        .map(|label| {
            let texts = spans
                .iter()
                .filter(|span| span.has(label))
                .map(|span| span.text.as_str())
                .collect::<Vec<_>>();
            (label, texts)
        })
        .filter(|(_, texts)| !texts.is_empty())
        .collect()
}

/// Materialize one ledger row from a submission
pub fn build_record(
    user_id: &str,
    text_index: usize,
    full_text: &str,
    debate_unit_id: Option<u64>,
    spans: &[LabeledSpan],
    comment: &str,
    captured_at: &NaiveDateTime,
) -> AnnotationRecord {
    AnnotationRecord {
        user_id: user_id.to_string(),
        text_index,
        full_text: full_text.to_string(),
        debate_unit_id,
        check_worthy: join_label(spans, Label::CheckWorthy),
        other: join_label(spans, Label::Other),
        comment_field: comment.to_string(),
        timestamp: format_record_timestamp(captured_at),
    }
}

/// [`build_record`] stamped with the current local time
pub fn build_record_now(
    user_id: &str,
    text_index: usize,
    full_text: &str,
    debate_unit_id: Option<u64>,
    spans: &[LabeledSpan],
    comment: &str,
) -> AnnotationRecord {
    build_record(
        user_id,
        text_index,
        full_text,
        debate_unit_id,
        spans,
        comment,
        &local_now(),
    )
}
