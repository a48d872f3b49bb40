//! Persistence buffer: pending records, request counter, single-flight flush.
//!
//! Completions push into the pending buffer and bump the counter under one
//! lock. A flush takes the sheet lock for its whole duration, so concurrent
//! callers queue behind it and then find an empty buffer.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::identity::Record;
use crate::storage::{StorageError, StorageSheet};

/// What one effective flush wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Records drained from the buffer by this flush.
    pub rows_written: usize,
    /// Data rows in the sheet after the flush (header excluded).
    pub data_rows: usize,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
struct Pending {
    records: Vec<Record>,
    completed: u64,
}

pub struct PersistenceBuffer {
    pending: Mutex<Pending>,
    sheet: tokio::sync::Mutex<StorageSheet>,
    flush_every: u64,
    path: PathBuf,
}

impl PersistenceBuffer {
    /// `flush_every` is the cadence in completed requests (clamped to at least 1).
    pub fn new(sheet: StorageSheet, flush_every: u64) -> Self {
        let path = sheet.path().to_path_buf();
        Self {
            pending: Mutex::new(Pending::default()),
            sheet: tokio::sync::Mutex::new(sheet),
            flush_every: flush_every.max(1),
            path,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn flush_every(&self) -> u64 {
        self.flush_every
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a record without counting a completed request.
    pub fn append(&self, record: Record) {
        self.pending().records.push(record);
    }

    /// Account for one finished request: buffer its record (if any) and bump
    /// the counter in one step. Returns true when a cadence flush is due.
    pub fn record_completion(&self, record: Option<Record>) -> bool {
        let mut pending = self.pending();
        if let Some(record) = record {
            pending.records.push(record);
        }
        pending.completed += 1;
        pending.completed % self.flush_every == 0
    }

    /// Requests completed so far (success or terminal failure).
    pub fn completed(&self) -> u64 {
        self.pending().completed
    }

    /// Records waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.pending().records.len()
    }

    /// Drain the buffer into the sheet and write the whole workbook.
    ///
    /// Returns `Ok(None)` without touching the file when there is nothing to
    /// write. If the write fails the drained rows stay in the sheet and go
    /// out with the next flush.
    pub async fn flush(&self) -> Result<Option<FlushReport>, StorageError> {
        let mut sheet = self.sheet.lock().await;
        let drained = std::mem::take(&mut self.pending().records);
        if drained.is_empty() && !sheet.has_unsaved_rows() {
            return Ok(None);
        }

        tracing::info!("saving {} records to workbook...", drained.len());
        sheet.append_records(&drained);

        // The image stays behind the lock; the blocking task only sees a snapshot.
        let snapshot = sheet.snapshot();
        tokio::task::spawn_blocking(move || snapshot.write()).await??;
        sheet.mark_saved();

        let report = FlushReport {
            rows_written: drained.len(),
            data_rows: sheet.data_row_count(),
            path: self.path.clone(),
        };
        tracing::info!(
            rows = report.rows_written,
            total = report.data_rows,
            "saved to {}",
            report.path.display()
        );
        Ok(Some(report))
    }

    /// Data rows currently in the sheet image (written or not).
    pub async fn data_rows(&self) -> usize {
        self.sheet.lock().await.data_row_count()
    }
}
