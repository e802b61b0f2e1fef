//! Session and progress tracking
//!
//! Each browser session owns a [`SessionState`]. Before login it only caches
//! the allow-list; login attaches an [`AnnotatorSession`], logout drops the
//! whole state.
//!
//! Phases:
//! - `LoggedOut` → `Active` on successful login
//! - `Active` → `Active` on each accepted submission (cursor + 1)
//! - `Active` → `Finished` once the cursor runs past the unannotated units
//! - `Active | Finished` → `LoggedOut` on logout
//!
//! The cursor indexes the *filtered* corpus (units not in `annotated_texts`),
//! and `annotated_texts` is the snapshot taken at login. It is not refreshed
//! while the session runs.

mod store;

pub use store::SessionStore;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::directory::AllowList;
use crate::models::AnnotationRecord;
use crate::persistence::{AnnotationBuffer, BatchWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    LoggedOut,
    Active,
    Finished,
}

/// State of one browser session
#[derive(Debug)]
pub struct SessionState {
    /// Allow-list cached on first use
    pub allowed_users: Option<Arc<AllowList>>,
    /// Present while someone is logged in
    pub annotator: Option<AnnotatorSession>,
    last_seen: Instant,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            allowed_users: None,
            annotator: None,
            last_seen: Instant::now(),
        }
    }

    pub fn phase(&self) -> Phase {
        match &self.annotator {
            None => Phase::LoggedOut,
            Some(annotator) if annotator.finished => Phase::Finished,
            Some(_) => Phase::Active,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen.elapsed()
    }

    /// Tear down: flush any buffered annotations and drop everything else
    pub fn close(self, writer: &BatchWriter) -> Option<JoinHandle<()>> {
        self.annotator.and_then(|annotator| annotator.close(writer))
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the annotator stands in their corpus
#[derive(Debug)]
pub enum Progress<'c> {
    /// Next unit to annotate
    Current {
        /// Cursor into the unannotated sequence
        index: usize,
        /// Length of the unannotated sequence
        total: usize,
        text: &'c str,
    },
    /// Nothing left; `flush` is the force-flush this render triggered, if any
    Finished { flush: Option<JoinHandle<()>> },
}

/// Per-user workflow state, created at login
#[derive(Debug)]
pub struct AnnotatorSession {
    pub user_id: String,
    /// Cursor into the unannotated sequence
    pub text_index: usize,
    pub annotations: AnnotationBuffer,
    /// `full_text` values already in the ledger at login
    pub annotated_texts: HashSet<String>,
    pub finished: bool,
    /// Ledger sheet creation has been dispatched
    pub worksheet_ready: bool,
    /// Draft comment kept across a rejected submission
    pub comment_text: String,
}

impl AnnotatorSession {
    pub fn start(user_id: String, annotated_texts: HashSet<String>, batch_size: usize) -> Self {
        Self {
            user_id,
            text_index: 0,
            annotations: AnnotationBuffer::new(batch_size),
            annotated_texts,
            finished: false,
            worksheet_ready: false,
            comment_text: String::new(),
        }
    }

    /// Corpus units not yet annotated, in corpus order
    pub fn unannotated<'c>(&self, corpus: &'c [String]) -> Vec<&'c str> {
        corpus
            .iter()
            .filter(|text| !self.annotated_texts.contains(text.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Resolve the current unit, moving to `Finished` when none is left
    ///
    /// Entering or staying in `Finished` force-flushes the buffer.
    pub fn progress<'c>(&mut self, corpus: &'c [String], writer: &BatchWriter) -> Progress<'c> {
        let remaining = self.unannotated(corpus);

        if !self.finished && self.text_index < remaining.len() {
            return Progress::Current {
                index: self.text_index,
                total: remaining.len(),
                text: remaining[self.text_index],
            };
        }

        if !self.finished {
            tracing::info!(user_id = %self.user_id, annotated = self.text_index, "All texts annotated");
        }
        self.finished = true;
        Progress::Finished {
            flush: writer.force_flush(&self.user_id, &mut self.annotations),
        }
    }

    /// Accept one annotation: buffer it, advance the cursor, flush a full batch
    pub fn submit(&mut self, record: AnnotationRecord, writer: &BatchWriter) -> Option<JoinHandle<()>> {
        self.annotations.enqueue(record);
        self.text_index += 1;
        self.comment_text.clear();
        writer.maybe_flush(&self.user_id, &mut self.annotations)
    }

    /// Logout: force-flush whatever is still buffered
    pub fn close(mut self, writer: &BatchWriter) -> Option<JoinHandle<()>> {
        tracing::info!(
            user_id = %self.user_id,
            buffered = self.annotations.len(),
            "Closing annotation session"
        );
        writer.force_flush(&self.user_id, &mut self.annotations)
    }
}
