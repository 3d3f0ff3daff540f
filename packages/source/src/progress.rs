//! Progress reporting for a run.
//!
//! The pipeline reports one unit of work per court through
//! [`ProgressCallback`]; the CLI renders it as an `indicatif` bar and
//! tests pass [`null_progress`].

use std::sync::Arc;

/// Receives per-court progress from the pipeline.
pub trait ProgressCallback: Send + Sync {
    /// Set the total number of courts to process.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` courts.
    fn inc(&self, delta: u64);

    /// Show the court currently being processed.
    fn set_message(&self, msg: String);

    /// Report the run's saved and skipped counts.
    fn finish(&self, msg: String);
}

/// A [`ProgressCallback`] that ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Progress sink for callers without a terminal.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
