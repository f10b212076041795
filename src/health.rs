//! Recurring health checks driving [`Connectivity`].

use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::state::{Connectivity, StateTracker};

struct PollHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns at most one running poll task.
///
/// `start` checks once immediately and then every `interval`. `stop` is
/// idempotent; a check already in flight finishes but nothing new is scheduled.
pub(crate) struct HealthPoller {
    tracker: Arc<StateTracker>,
    handle: Mutex<Option<PollHandle>>,
}

impl fmt::Debug for HealthPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthPoller")
            .field("running", &self.is_running())
            .finish()
    }
}

impl HealthPoller {
    pub(crate) fn new(tracker: Arc<StateTracker>) -> Self {
        Self {
            tracker,
            handle: Mutex::new(None),
        }
    }

    /// Starts polling, replacing any poll task that is already running.
    pub fn start<F, Fut, E>(&self, interval: Duration, check: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.cancel.cancel();
        }

        let interval = interval.max(Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tracker = Arc::clone(&self.tracker);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(
                interval_ms = interval.as_millis() as u64,
                "health polling started"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match check().await {
                    Ok(()) => tracker.set_connectivity(Connectivity::Online),
                    Err(err) => {
                        tracing::warn!(error = %err, "health check failed");
                        tracker.set_connectivity(Connectivity::Offline);
                    }
                }
            }

            tracing::info!("health polling stopped");
        });

        *slot = Some(PollHandle { cancel, task });
    }

    /// Cancels the running poll task, if any.
    pub fn stop(&self) {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.cancel.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }
}

impl Drop for HealthPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
