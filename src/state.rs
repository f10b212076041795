use chrono::{DateTime, Utc};
use tokio::sync::watch;

/// Fallback message for failures whose text is empty.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Recorded when a tracked call is dropped before it resolves.
pub const CANCELLED_CALL: &str = "call cancelled before completion";

/// Lifecycle of the most recently resolved tracked call.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Reachability of the backend as seen by the health poller.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(self) -> bool {
        self == Self::Online
    }
}

/// Read-only view of the client core state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApiSnapshot {
    pub status: RequestState,
    pub last_error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub connectivity: Connectivity,
}

impl ApiSnapshot {
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn is_loading(&self) -> bool {
        self.status == RequestState::Loading
    }
}

/// Owner of the shared snapshot.
///
/// Only the crate mutates it; callers get clones or a watch receiver.
#[derive(Debug)]
pub(crate) struct StateTracker {
    tx: watch::Sender<ApiSnapshot>,
}

impl Default for StateTracker {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(ApiSnapshot::default());
        Self { tx }
    }
}

impl StateTracker {
    pub fn snapshot(&self) -> ApiSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ApiSnapshot> {
        self.tx.subscribe()
    }

    pub fn begin(&self) {
        self.tx.send_modify(|state| state.status = RequestState::Loading);
    }

    /// Enters `Loading` and returns a guard that must resolve the call.
    ///
    /// Dropping the guard unresolved records [`CANCELLED_CALL`].
    pub fn track(&self) -> TrackedCall<'_> {
        self.begin();
        TrackedCall {
            tracker: self,
            resolved: false,
        }
    }

    pub fn succeed(&self) {
        self.succeed_at(Utc::now());
    }

    pub fn succeed_at(&self, now: DateTime<Utc>) {
        self.tx.send_modify(|state| {
            state.status = RequestState::Success;
            state.last_error = None;
            // Wall clock can step backwards; the timestamp must not.
            state.last_update = Some(match state.last_update {
                Some(previous) if previous > now => previous,
                _ => now,
            });
        });
    }

    pub fn fail(&self, message: &str) {
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR.to_owned()
        } else {
            message.to_owned()
        };
        self.tx.send_modify(|state| {
            state.status = RequestState::Error;
            state.last_error = Some(message);
        });
    }

    pub fn set_connectivity(&self, connectivity: Connectivity) {
        self.tx.send_if_modified(|state| {
            if state.connectivity == connectivity {
                return false;
            }
            state.connectivity = connectivity;
            true
        });
    }
}

/// One in-flight tracked call.
pub(crate) struct TrackedCall<'a> {
    tracker: &'a StateTracker,
    resolved: bool,
}

impl TrackedCall<'_> {
    pub fn succeed(mut self) {
        self.resolved = true;
        self.tracker.succeed();
    }

    pub fn fail(mut self, message: &str) {
        self.resolved = true;
        self.tracker.fail(message);
    }
}

impl Drop for TrackedCall<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            tracing::debug!("tracked call dropped before completion");
            self.tracker.fail(CANCELLED_CALL);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{Connectivity, RequestState, StateTracker, CANCELLED_CALL, UNKNOWN_ERROR};

    #[test]
    fn starts_idle_and_online() {
        let tracker = StateTracker::default();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, RequestState::Idle);
        assert!(snapshot.is_online());
        assert!(snapshot.last_error.is_none());
        assert!(snapshot.last_update.is_none());
    }

    #[test]
    fn success_clears_error_and_stamps_time() {
        let tracker = StateTracker::default();
        tracker.begin();
        tracker.fail("boom");
        assert_eq!(tracker.snapshot().last_error.as_deref(), Some("boom"));

        tracker.begin();
        assert!(tracker.snapshot().is_loading());
        // Error message survives until the next success.
        assert_eq!(tracker.snapshot().last_error.as_deref(), Some("boom"));

        tracker.succeed();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, RequestState::Success);
        assert!(snapshot.last_error.is_none());
        assert!(snapshot.last_update.is_some());
    }

    #[test]
    fn failure_does_not_touch_last_update() {
        let tracker = StateTracker::default();
        tracker.succeed();
        let stamped = tracker.snapshot().last_update;
        tracker.fail("later failure");
        assert_eq!(tracker.snapshot().last_update, stamped);
    }

    #[test]
    fn empty_failure_message_uses_fallback() {
        let tracker = StateTracker::default();
        tracker.fail("  ");
        assert_eq!(tracker.snapshot().last_error.as_deref(), Some(UNKNOWN_ERROR));
    }

    #[test]
    fn last_update_never_moves_backwards() {
        let tracker = StateTracker::default();
        let now = Utc::now();
        tracker.succeed_at(now);
        tracker.succeed_at(now - Duration::seconds(5));
        assert_eq!(tracker.snapshot().last_update, Some(now));
    }

    #[test]
    fn connectivity_is_independent_of_request_state() {
        let tracker = StateTracker::default();
        tracker.set_connectivity(Connectivity::Offline);
        tracker.begin();
        tracker.succeed();
        assert_eq!(tracker.snapshot().connectivity, Connectivity::Offline);
        tracker.fail("chat failed");
        assert_eq!(tracker.snapshot().connectivity, Connectivity::Offline);
    }

    #[test]
    fn dropped_call_does_not_stay_loading() {
        let tracker = StateTracker::default();
        let call = tracker.track();
        assert!(tracker.snapshot().is_loading());
        drop(call);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, RequestState::Error);
        assert_eq!(snapshot.last_error.as_deref(), Some(CANCELLED_CALL));
    }

    #[test]
    fn resolved_call_is_not_overwritten_on_drop() {
        let tracker = StateTracker::default();
        tracker.track().succeed();
        assert_eq!(tracker.snapshot().status, RequestState::Success);
        tracker.track().fail("boom");
        assert_eq!(tracker.snapshot().last_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let tracker = StateTracker::default();
        let mut rx = tracker.subscribe();
        tracker.begin();
        rx.changed().await.expect("sender alive");
        assert_eq!(rx.borrow_and_update().status, RequestState::Loading);
    }
}
