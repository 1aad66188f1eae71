//! Console status and the success-indicator timer

use crate::error::ConsoleError;
use crate::rebase::RebasePhase;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::AbortHandle;

/// Caller-visible console status
#[derive(Debug, Clone, Default)]
pub struct ConsoleStatus {
    /// A fetch is in flight
    pub loading: bool,
    /// A commit is in flight
    pub saving: bool,
    /// Success indicator; cleared automatically after the success window
    pub saved: bool,
    /// Save lifecycle phase
    pub phase: RebasePhase,
    /// Most recent error, cleared by the next successful load, save or rebase
    pub last_error: Option<ConsoleError>,
    /// When the last successful save completed
    pub last_saved_at: Option<DateTime<Utc>>,
}

/// Auto-clear task for the success indicator
///
/// At most one task is pending. Scheduling replaces (and aborts) the
/// previous one; dropping the timer aborts whatever is pending.
#[derive(Debug, Default)]
pub(crate) struct SuccessTimer {
    pending: Mutex<Option<AbortHandle>>,
}

impl SuccessTimer {
    /// Clear `status.saved` after `window`
    ///
    /// The task holds only a weak reference, so it never keeps a torn-down
    /// console's status alive.
    pub(crate) fn schedule(&self, window: Duration, status: Weak<Mutex<ConsoleStatus>>) {
        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(status) = status.upgrade() {
                status.lock().saved = false;
                tracing::debug!("success indicator cleared");
            }
        });
        if let Some(previous) = self.pending.lock().replace(task.abort_handle()) {
            previous.abort();
        }
    }

    /// Abort the pending task; returns whether one was pending
    pub(crate) fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for SuccessTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn clears_after_window() {
        let status = Arc::new(Mutex::new(ConsoleStatus {
            saved: true,
            ..ConsoleStatus::default()
        }));
        let timer = SuccessTimer::default();
        timer.schedule(Duration::from_millis(3_000), Arc::downgrade(&status));

        tokio::time::sleep(Duration::from_millis(2_999)).await;
        assert!(status.lock().saved);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!status.lock().saved);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let status = Arc::new(Mutex::new(ConsoleStatus {
            saved: true,
            ..ConsoleStatus::default()
        }));
        let timer = SuccessTimer::default();
        timer.schedule(Duration::from_millis(3_000), Arc::downgrade(&status));
        assert!(timer.cancel());
        assert!(!timer.cancel());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(status.lock().saved);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_restarts_the_window() {
        let status = Arc::new(Mutex::new(ConsoleStatus {
            saved: true,
            ..ConsoleStatus::default()
        }));
        let timer = SuccessTimer::default();
        timer.schedule(Duration::from_millis(3_000), Arc::downgrade(&status));
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        timer.schedule(Duration::from_millis(3_000), Arc::downgrade(&status));

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert!(status.lock().saved);
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(!status.lock().saved);
    }
}
