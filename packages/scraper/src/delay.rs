//! Injectable sleep strategy for backoff and cooldown.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

/// Something that can wait for a duration.
#[async_trait]
pub trait Delay: Send + Sync {
    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately and remembers every requested duration.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    /// Creates a delay with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slept: Mutex::new(Vec::new()),
        }
    }

    /// Durations requested so far, in order.
    #[must_use]
    pub fn recorded(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep(&self, duration: Duration) {
        self.slept
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}
