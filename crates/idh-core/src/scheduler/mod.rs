//! Batch scheduler.
//!
//! Drives the pipeline: bounded task set → retrying fetcher → record mapping →
//! persistence buffer (cadence flush) → final flush, with a cooperative
//! shutdown flag checked between completions.

mod parallel;
mod progress;

pub use parallel::{run_batch, BatchError, BatchOptions, RunSummary};
pub use progress::ProgressStats;
