//! Run a batch of identity requests with bounded concurrency.
//!
//! Keeps up to `max_concurrency` requests in flight; when one finishes, its
//! outcome is accounted for and the next index is admitted until all `total`
//! requests have been issued. Completions are handled one at a time on the
//! calling task, so buffer append, counter bump and cadence check never
//! interleave.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;

use crate::buffer::{FlushReport, PersistenceBuffer};
use crate::control::ShutdownCoordinator;
use crate::identity::{IdentitySource, Record};
use crate::retry::{FetchOutcome, RetryingFetcher};
use crate::storage::StorageError;

use super::progress::ProgressStats;

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Number of requests to issue.
    pub total: u64,
    /// Maximum requests in flight (clamped to at least 1).
    pub max_concurrency: usize,
}

/// Counts for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: u64,
    /// Requests started (less than `total` when interrupted).
    pub admitted: u64,
    /// Requests whose outcome was accounted for.
    pub completed: u64,
    pub succeeded: u64,
    pub skipped: u64,
    /// Stopped early by the shutdown flag.
    pub interrupted: bool,
    /// Flushes that actually wrote the workbook.
    pub flushes: u32,
    /// Records written to the workbook by this run.
    pub rows_saved: usize,
    pub path: PathBuf,
}

impl RunSummary {
    fn note_flush(&mut self, report: &FlushReport) {
        self.flushes += 1;
        self.rows_saved += report.rows_written;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The final save failed; buffered records may be lost.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A request task panicked. Buffered records were saved before returning.
    #[error("request task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Runs `opts.total` fetches through `fetcher`, at most `opts.max_concurrency`
/// at a time, feeding successes into `buffer` and flushing on its cadence.
///
/// Always ends with one final flush: after the last request settles, after
/// `shutdown` is triggered (in-flight requests are abandoned, nothing new is
/// admitted), or after a request task panics.
/// Progress from every completion is offered to `progress_tx` (dropped if full).
pub async fn run_batch<S>(
    fetcher: Arc<RetryingFetcher<S>>,
    buffer: &PersistenceBuffer,
    opts: BatchOptions,
    shutdown: &ShutdownCoordinator,
    progress_tx: Option<&tokio::sync::mpsc::Sender<ProgressStats>>,
) -> Result<RunSummary, BatchError>
where
    S: IdentitySource + 'static,
{
    let max_concurrent = opts.max_concurrency.max(1);
    let started = Instant::now();
    let mut summary = RunSummary {
        total: opts.total,
        path: buffer.path().to_path_buf(),
        ..RunSummary::default()
    };
    let mut next_index = 0u64;
    let mut join_set: JoinSet<(u64, FetchOutcome)> = JoinSet::new();
    let mut task_failure = None;

    loop {
        while join_set.len() < max_concurrent
            && next_index < opts.total
            && !shutdown.is_triggered()
        {
            let index = next_index;
            next_index += 1;
            let fetcher = Arc::clone(&fetcher);
            join_set.spawn(async move { (index, fetcher.fetch(index).await) });
        }

        if shutdown.is_triggered() {
            summary.interrupted = true;
            break;
        }
        if join_set.is_empty() {
            break;
        }

        let joined = tokio::select! {
            biased;
            _ = shutdown.triggered() => {
                summary.interrupted = true;
                break;
            }
            joined = join_set.join_next() => joined,
        };
        let Some(joined) = joined else {
            break;
        };
        let (index, outcome) = match joined {
            Ok(done) => done,
            Err(e) => {
                tracing::error!("request task failed: {}", e);
                task_failure = Some(e);
                break;
            }
        };

        if complete_one(buffer, index, outcome, &mut summary) {
            match buffer.flush().await {
                Ok(Some(report)) => summary.note_flush(&report),
                Ok(None) => {}
                Err(e) => tracing::warn!("periodic save failed, rows kept for the next save: {}", e),
            }
        }

        if let Some(tx) = progress_tx {
            let _ = tx.try_send(ProgressStats::of(&summary, started));
        }
    }

    summary.admitted = next_index;
    if !join_set.is_empty() {
        tracing::warn!("abandoning {} in-flight request(s)", join_set.len());
        join_set.abort_all();
    }
    drop(join_set);

    if summary.interrupted {
        tracing::info!("process exiting, saving remaining data...");
    } else if task_failure.is_none() {
        tracing::info!("all requests completed");
    }
    if let Some(report) = buffer.flush().await? {
        summary.note_flush(&report);
    }
    if let Some(tx) = progress_tx {
        let _ = tx.try_send(ProgressStats::of(&summary, started));
    }

    if summary.skipped > 0 {
        tracing::warn!("{} request(s) skipped", summary.skipped);
    }
    match task_failure {
        Some(e) => Err(BatchError::Task(e)),
        None => Ok(summary),
    }
}

/// Account for one settled request. Returns true when a cadence flush is due.
fn complete_one(
    buffer: &PersistenceBuffer,
    index: u64,
    outcome: FetchOutcome,
    summary: &mut RunSummary,
) -> bool {
    let request = index + 1;
    let record: Option<Record> = match outcome {
        FetchOutcome::Success(envelope) => match envelope.into_record() {
            Ok(record) => Some(record),
            Err(reason) => {
                tracing::warn!(request, "skipping request {}: {}", request, reason);
                None
            }
        },
        FetchOutcome::Failure(reason) => {
            tracing::warn!(request, "skipping request {} due to error: {}", request, reason);
            None
        }
    };

    summary.completed += 1;
    if record.is_some() {
        summary.succeeded += 1;
    } else {
        summary.skipped += 1;
    }
    buffer.record_completion(record)
}
