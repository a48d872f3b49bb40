//! Progress snapshots sent to the CLI after every settled request.

use std::time::{Duration, Instant};

use super::parallel::RunSummary;

/// Counts of a running batch at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressStats {
    pub completed: u64,
    /// Completions that produced a record.
    pub succeeded: u64,
    /// Completions that failed or came back without an identity.
    pub skipped: u64,
    pub total: u64,
    pub elapsed: Duration,
}

impl ProgressStats {
    pub(crate) fn of(summary: &RunSummary, started: Instant) -> Self {
        Self {
            completed: summary.completed,
            succeeded: summary.succeeded,
            skipped: summary.skipped,
            total: summary.total,
            elapsed: started.elapsed(),
        }
    }

    pub fn remaining(&self) -> u64 {
        self.total.saturating_sub(self.completed)
    }

    /// Settled requests per second, if any time has passed.
    pub fn rate(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0).then(|| self.completed as f64 / secs)
    }

    /// Time left at the current rate. `None` until the first completion.
    pub fn eta(&self) -> Option<Duration> {
        if self.remaining() == 0 {
            return Some(Duration::ZERO);
        }
        match self.rate() {
            Some(rate) if rate > 0.0 => Some(Duration::from_secs_f64(self.remaining() as f64 / rate)),
            _ => None,
        }
    }

    /// Share of the batch settled, 0 to 100.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed.min(self.total) as f64 / self.total as f64) * 100.0
    }

    /// Share of settled requests that produced a row.
    pub fn success_ratio(&self) -> Option<f64> {
        (self.completed > 0).then(|| self.succeeded as f64 / self.completed as f64)
    }
}
