use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    health::HealthPoller,
    retry::{self, RetryPolicy},
    state::{Connectivity, StateTracker},
    upload::{validate_speech_text, UploadFile},
    ApiSnapshot, AudioReply, ChatReply, GodofredaClient, HealthReport, Personality,
    PersonalityProfile, Result, ServiceInfo, StatusReport,
};

/// Client core with retries, request state and health polling.
///
/// Every tracked call moves the shared [`ApiSnapshot`] to `Loading` once,
/// then to `Success` or `Error` when it resolves. Concurrent calls share the
/// snapshot and the last one to resolve wins; each call's own outcome is its
/// returned `Result`. Connectivity is only changed by health checks.
///
/// A tracked call whose future is dropped before it resolves records
/// [`crate::CANCELLED_CALL`] as an error instead of staying `Loading`.
pub struct GodofredaApi {
    client: GodofredaClient,
    tracker: Arc<StateTracker>,
    poller: HealthPoller,
    shutdown: Mutex<CancellationToken>,
}

impl fmt::Debug for GodofredaApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GodofredaApi")
            .field("client", &self.client)
            .field("snapshot", &self.snapshot())
            .field("poller", &self.poller)
            .finish()
    }
}

impl GodofredaApi {
    /// Wraps `client`, starting the health poller if
    /// [`crate::ClientOptions::auto_check_health`] is set.
    ///
    /// Must be called from within a Tokio runtime when polling is enabled.
    pub fn new(client: GodofredaClient) -> Self {
        let tracker = Arc::new(StateTracker::default());
        let api = Self {
            poller: HealthPoller::new(Arc::clone(&tracker)),
            tracker,
            client,
            shutdown: Mutex::new(CancellationToken::new()),
        };
        if api.client.options().auto_check_health {
            api.start_health_polling();
        }
        api
    }

    pub fn client(&self) -> &GodofredaClient {
        &self.client
    }

    pub fn snapshot(&self) -> ApiSnapshot {
        self.tracker.snapshot()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ApiSnapshot> {
        self.tracker.subscribe()
    }

    pub fn is_online(&self) -> bool {
        self.snapshot().is_online()
    }

    /// Runs `op` as a tracked call with the configured retry policy.
    pub async fn with_retry<T, E, F, Fut>(&self, op: F) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        let policy = self.client.options().retry;
        self.with_retry_policy(&policy, op).await
    }

    /// Runs `op` as a tracked call with an explicit retry policy.
    pub async fn with_retry_policy<T, E, F, Fut>(
        &self,
        policy: &RetryPolicy,
        op: F,
    ) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        let cancel = self
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let call = self.tracker.track();
        let result = retry::run(policy, &cancel, op).await;
        match &result {
            Ok(_) => call.succeed(),
            Err(err) => call.fail(&err.to_string()),
        }
        result
    }

    /// One-off health check. Updates connectivity and returns the outcome.
    pub async fn check_health(&self) -> Result<HealthReport> {
        match self.client.health().await {
            Ok(report) => {
                self.tracker.set_connectivity(Connectivity::Online);
                Ok(report)
            }
            Err(err) => {
                self.tracker.set_connectivity(Connectivity::Offline);
                Err(err)
            }
        }
    }

    /// Starts polling `/health` at the configured interval.
    pub fn start_health_polling(&self) {
        self.start_health_polling_every(self.client.options().health_check_interval());
    }

    /// Starts polling `/health` every `interval`, replacing a running poller.
    pub fn start_health_polling_every(&self, interval: Duration) {
        let client = self.client.clone();
        self.poller.start(interval, move || {
            let client = client.clone();
            async move { client.health().await.map(|_| ()) }
        });
    }

    pub fn stop_health_polling(&self) {
        self.poller.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Stops polling and cancels pending retry backoffs.
    ///
    /// Requests already on the wire are left to finish. The API stays usable:
    /// calls started afterwards retry with their full policy and polling can
    /// be started again.
    pub fn shutdown(&self) {
        self.poller.stop();
        let mut token = self.shutdown.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
    }

    pub async fn service_info(&self) -> Result<ServiceInfo> {
        let client = &self.client;
        self.with_retry(move || client.service_info()).await
    }

    pub async fn get_status(&self) -> Result<StatusReport> {
        let client = &self.client;
        self.with_retry(move || client.status()).await
    }

    pub async fn readiness(&self) -> Result<HealthReport> {
        let client = &self.client;
        self.with_retry(move || client.ready()).await
    }

    pub async fn liveness(&self) -> Result<HealthReport> {
        let client = &self.client;
        self.with_retry(move || client.live()).await
    }

    pub async fn metrics(&self) -> Result<String> {
        let client = &self.client;
        self.with_retry(move || client.metrics()).await
    }

    pub async fn get_personality(&self) -> Result<PersonalityProfile> {
        let client = &self.client;
        self.with_retry(move || client.personality()).await
    }

    pub async fn update_personality(&self, personality: &Personality) -> Result<()> {
        let client = &self.client;
        self.with_retry(move || client.update_personality(personality))
            .await
    }

    pub async fn send_chat_message(&self, message: &str, context: &str) -> Result<ChatReply> {
        let client = &self.client;
        self.with_retry(move || client.chat(message, context)).await
    }

    /// Multimodal chat. Attachments are validated once, outside the retry loop.
    pub async fn send_multimodal_message(
        &self,
        text: &str,
        image: Option<&UploadFile>,
        voice: Option<&UploadFile>,
    ) -> Result<AudioReply> {
        self.client.validate_attachments(image, voice)?;
        let client = &self.client;
        self.with_retry(move || client.multimodal_chat(text, image, voice))
            .await
    }

    /// Text-to-speech. Text is validated once, outside the retry loop.
    pub async fn synthesize_text(&self, text: &str) -> Result<AudioReply> {
        validate_speech_text(text)?;
        let client = &self.client;
        self.with_retry(move || client.synthesize(text)).await
    }
}

impl Drop for GodofredaApi {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    use tokio::time::Instant;

    use super::GodofredaApi;
    use crate::{
        ClientOptions, Connectivity, GodofredaClient, RequestState, RetryPolicy, CANCELLED_CALL,
    };

    fn offline_api(retry: RetryPolicy) -> GodofredaApi {
        let client = GodofredaClient::new("http://127.0.0.1:9").with_options(ClientOptions {
            retry,
            auto_check_health: false,
            ..ClientOptions::default()
        });
        GodofredaApi::new(client)
    }

    #[tokio::test(start_paused = true)]
    async fn fails_twice_then_succeeds_with_growing_delays() {
        let api = offline_api(RetryPolicy::new(3, 1_000, 2));
        let start = Instant::now();
        let calls = AtomicU32::new(0);

        let result: Result<&str, String> = api
            .with_retry(|| {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if call < 3 {
                        Err("network error".to_owned())
                    } else {
                        Ok("third")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("third"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(3_000));
        let snapshot = api.snapshot();
        assert_eq!(snapshot.status, RequestState::Success);
        assert!(snapshot.last_error.is_none());
        assert!(snapshot.last_update.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_call_records_error() {
        let api = offline_api(RetryPolicy::default());
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = api
            .with_retry(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("boom".to_owned()) }
            })
            .await;

        assert_eq!(result, Err("boom".to_owned()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let snapshot = api.snapshot();
        assert_eq!(snapshot.status, RequestState::Error);
        assert_eq!(snapshot.last_error.as_deref(), Some("boom"));
        assert!(snapshot.last_update.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn loading_is_entered_once_per_call() {
        let api = offline_api(RetryPolicy::new(3, 10, 1));
        let mut rx = api.subscribe();
        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let status = rx.borrow_and_update().status;
                seen.push(status);
                if status == RequestState::Error {
                    break;
                }
            }
            seen
        });

        let calls = AtomicU32::new(0);
        let _: Result<(), &str> = api
            .with_retry(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                assert!(api.snapshot().is_loading());
                async { Err("nope") }
            })
            .await;

        let seen = watcher.await.expect("watcher task");
        assert_eq!(seen, vec![RequestState::Loading, RequestState::Error]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn state_is_not_reset_between_calls() {
        let api = offline_api(RetryPolicy::no_retry());
        let _: Result<u8, &str> = api.with_retry(|| async { Ok(1) }).await;
        assert_eq!(api.snapshot().status, RequestState::Success);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.snapshot().status, RequestState::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_backoff() {
        let api = offline_api(RetryPolicy::new(3, 60_000, 2));
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let call = api.with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("down") }
        });
        let stop = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            api.shutdown();
        };
        let (result, ()) = tokio::join!(call, stop);

        assert_eq!(result, Err("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
        assert_eq!(api.snapshot().status, RequestState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn calls_after_shutdown_keep_their_retries() {
        let api = offline_api(RetryPolicy::new(3, 10, 1));
        api.shutdown();
        api.start_health_polling_every(Duration::from_secs(60));
        assert!(api.is_polling());

        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = api
            .with_retry(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("down") }
            })
            .await;

        assert_eq!(result, Err("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        api.shutdown();
        assert!(!api.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_call_does_not_stay_loading() {
        let api = offline_api(RetryPolicy::default());
        let timed_out = tokio::time::timeout(
            Duration::from_millis(10),
            api.with_retry(std::future::pending::<Result<(), String>>),
        )
        .await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_secs(3_600)).await;
        let snapshot = api.snapshot();
        assert_eq!(snapshot.status, RequestState::Error);
        assert_eq!(snapshot.last_error.as_deref(), Some(CANCELLED_CALL));
    }

    #[tokio::test]
    async fn failed_feature_call_keeps_connectivity() {
        let api = offline_api(RetryPolicy::no_retry());
        let err = api
            .send_chat_message("hello", "")
            .await
            .expect_err("nothing listens on port 9");
        assert!(matches!(err, crate::GodofredaError::Transport(_)));
        assert_eq!(api.snapshot().connectivity, Connectivity::Online);
        assert_eq!(api.snapshot().status, RequestState::Error);
    }

    #[tokio::test]
    async fn validation_failure_skips_retry_and_state() {
        let api = offline_api(RetryPolicy::default());
        let err = api.synthesize_text("").await.expect_err("empty text");
        assert!(err.is_validation());
        assert_eq!(api.snapshot().status, RequestState::Idle);
    }
}
