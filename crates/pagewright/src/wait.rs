//! Polling waits for asynchronous page conditions.
//!
//! Used by navigation recipes for steps such as "wait for the modal to be
//! ready". Waits poll on the tokio clock, so paused-time tests advance them
//! deterministically. There is no retry of failed checks: an `Err` from the
//! condition ends the wait immediately.

use crate::result::{PageError, PageResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Outcome of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of times the condition was checked
    pub attempts: u32,
    /// What was waited for
    pub waited_for: String,
}

/// Poll `condition` until it reports `true` or the timeout elapses.
///
/// The condition is always checked at least once, even with a zero timeout.
pub async fn wait_for<F, Fut>(
    options: &WaitOptions,
    waited_for: impl Into<String>,
    mut condition: F,
) -> PageResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PageResult<bool>>,
{
    let waited_for = waited_for.into();
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;
        if condition().await? {
            tracing::trace!(%waited_for, attempts, "wait satisfied");
            return Ok(WaitResult {
                elapsed: start.elapsed(),
                attempts,
                waited_for,
            });
        }
        if start.elapsed() >= options.timeout() {
            tracing::debug!(%waited_for, attempts, timeout_ms = options.timeout_ms, "wait timed out");
            return Err(PageError::Timeout {
                ms: options.timeout_ms,
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}
