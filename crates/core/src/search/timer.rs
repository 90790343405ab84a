//! Cancellable one-shot timer.

use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Runs a callback once after a delay unless cancelled first.
///
/// Dropping the handle does not cancel the timer; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct DebounceTimer {
    handle: JoinHandle<()>,
}

impl DebounceTimer {
    /// Schedule `callback` to run after `delay`. Must be called within a Tokio runtime.
    pub fn start<F>(delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        Self { handle }
    }

    /// Stop the timer. Has no effect if the callback already ran.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the timer fired or was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
