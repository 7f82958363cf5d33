//! Cancellation signal threaded through an aggregation run.
//!
//! Synchronous probe steps poll the token between steps (they are short
//! and bounded, so mid-step interruption is not required); the external
//! interpreter fallback awaits it so a child process can be terminated
//! promptly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Shared cancellation token.
///
/// Cloning is cheap; all clones observe the same signal. A token is
/// one-shot per run — create a fresh one for each aggregation call.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    /// Create a new non-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Check whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Wait until cancellation is requested.
    ///
    /// Returns immediately if the token has already fired.
    pub async fn cancelled(&self) {
        // Register before the flag check so a concurrent cancel() between
        // the check and the await still wakes us.
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
