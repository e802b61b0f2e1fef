//! Batched background persistence
//!
//! Annotations collect in a per-session [`AnnotationBuffer`]. When a flush is
//! due the whole buffer is detached and handed to a spawned task; the buffer
//! is empty again before the task has even started. The interactive flow
//! never waits for the write and never learns whether it succeeded: a failed
//! flush is logged and its records are lost.

use tokio::task::JoinHandle;

use crate::ledger::Ledger;
use crate::models::AnnotationRecord;

/// Unsaved annotations of one session
#[derive(Debug, Clone)]
pub struct AnnotationBuffer {
    records: Vec<AnnotationRecord>,
    batch_size: usize,
}

impl AnnotationBuffer {
    pub fn new(batch_size: usize) -> Self {
        Self {
            records: Vec::new(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn enqueue(&mut self, record: AnnotationRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Detach the buffer if it has reached the batch size
    pub fn take_if_full(&mut self) -> Option<Vec<AnnotationRecord>> {
        if self.records.len() >= self.batch_size {
            Some(std::mem::take(&mut self.records))
        } else {
            None
        }
    }

    /// Detach everything, full or not
    pub fn take_all(&mut self) -> Vec<AnnotationRecord> {
        std::mem::take(&mut self.records)
    }
}

/// Dispatches ledger writes onto detached tasks
///
/// Every method returns the task's join handle only so tests can wait for it;
/// request handlers drop it.
#[derive(Clone)]
pub struct BatchWriter {
    ledger: Ledger,
}

impl BatchWriter {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Persist `batch` in the background; an empty batch spawns nothing
    pub fn submit(&self, user_id: &str, batch: Vec<AnnotationRecord>) -> Option<JoinHandle<()>> {
        if batch.is_empty() {
            return None;
        }

        let ledger = self.ledger.clone();
        let user_id = user_id.to_string();
        Some(tokio::spawn(async move {
            let count = batch.len();
            match ledger.append_annotations(&user_id, &batch).await {
                Ok(()) => {
                    tracing::info!(user_id = %user_id, records = count, "Saved annotation batch");
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        records = count,
                        error = %e,
                        "Background save failed; batch dropped"
                    );
                }
            }
        }))
    }

    /// Flush when the buffer has reached its batch size
    pub fn maybe_flush(
        &self,
        user_id: &str,
        buffer: &mut AnnotationBuffer,
    ) -> Option<JoinHandle<()>> {
        let batch = buffer.take_if_full()?;
        self.submit(user_id, batch)
    }

    /// Flush whatever is buffered (logout, completion, shutdown)
    pub fn force_flush(
        &self,
        user_id: &str,
        buffer: &mut AnnotationBuffer,
    ) -> Option<JoinHandle<()>> {
        let batch = buffer.take_all();
        self.submit(user_id, batch)
    }

    /// Create the user's ledger sheet in the background if it is missing
    pub fn ensure_user_sheet(&self, user_id: &str) -> JoinHandle<()> {
        let ledger = self.ledger.clone();
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = ledger.get_or_create_user_sheet(&user_id).await {
                tracing::warn!(user_id = %user_id, error = %e, "Ledger sheet setup failed");
            }
        })
    }
}
