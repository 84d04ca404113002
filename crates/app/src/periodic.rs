//! Cancellable fixed-interval background task.
//!
//! Used for the reconciliation sweep and the routine runner. A tick runs
//! immediately on spawn and then once per interval after the previous tick
//! finished, so ticks never overlap. Each tick runs as its own task: a tick
//! that panics is logged and the next one still runs on schedule. Stopping
//! interrupts the wait between ticks but lets an in-flight tick run to
//! completion.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a running periodic task.
pub struct PeriodicTask {
    name: &'static str,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn `tick` on the current runtime, repeating every `interval`.
    pub fn spawn<F, Fut>(name: &'static str, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            tracing::info!(task = name, interval_secs = interval.as_secs(), "periodic task started");
            loop {
                if let Err(err) = tokio::spawn(tick()).await {
                    tracing::error!(task = name, error = %err, "periodic tick failed, continuing");
                }
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }
            }
            tracing::info!(task = name, "periodic task stopped");
        });
        Self {
            name,
            cancel,
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the task and wait until it has exited.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                tracing::error!(task = self.name, error = %err, "periodic task ended abnormally");
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
