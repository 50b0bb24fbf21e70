// src/util.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Shared cancellation flag checked inside every poll loop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    TimedOut,
    Cancelled,
}

/// Re-checks `condition` every `interval` until it holds, the `timeout`
/// elapses, or `cancel` fires. Cancellation wins over completion so a
/// stopping run never starts new work.
pub async fn poll_until<F>(
    interval: Duration,
    timeout: Duration,
    cancel: &CancelToken,
    mut condition: F,
) -> PollOutcome
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }
        if condition() {
            return PollOutcome::Completed;
        }
        let now = Instant::now();
        if now >= deadline {
            return PollOutcome::TimedOut;
        }
        sleep(interval.min(deadline.saturating_duration_since(now))).await;
    }
}
