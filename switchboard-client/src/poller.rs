//! Polling remote collections
//!
//! A [`RemoteCollection`] keeps one screen's data approximately fresh: it
//! fetches immediately, then again on a fixed interval, and publishes a
//! [`FetchState`] through a `watch` channel.
//!
//! - Success replaces the held data wholesale and clears the error.
//! - Failure (transport, decoding, or a failed `status`) sets an error
//!   message and keeps the last good data.
//! - One task per collection; a fetch completes before the next tick is
//!   taken, so fetches of one collection never overlap.
//! - Every response is tagged with the parameter generation and session
//!   epoch it was issued under and is dropped if either changed meanwhile.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::ApiEnvelope;
use shared::types::Timestamp;
use tokio::sync::{Notify, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::http::{ApiRequest, HttpClient};
use crate::session::SessionStore;
use crate::{ClientError, ClientResult};

/// What a screen renders
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    /// Last good payload
    pub data: Option<T>,
    /// No response yet for the current parameters
    pub loading: bool,
    pub error: Option<String>,
    /// When `data` was last replaced (epoch ms)
    pub last_success_at: Option<Timestamp>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
            last_success_at: None,
        }
    }
}

/// How a decoded payload is judged successful
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessRule {
    /// `status` is `"success"` or `true`
    Success,
    /// `status` is any truthy value
    Truthy,
}

impl SuccessRule {
    fn accepts(self, envelope: &ApiEnvelope<Value>) -> bool {
        match self {
            SuccessRule::Success => envelope.is_success(),
            SuccessRule::Truthy => envelope.is_truthy(),
        }
    }
}

/// Shortest poll interval; shorter requests are raised to this
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Parameters of one polled resource
#[derive(Debug, Clone)]
pub struct PollSpec {
    /// Path relative to the API base, query included
    pub path: String,
    pub interval: Duration,
    pub rule: SuccessRule,
    /// Message shown when the server gives none
    pub fallback_error: String,
}

impl PollSpec {
    pub fn new(path: impl Into<String>, interval: Duration, fallback_error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            interval: clamp_interval(interval),
            rule: SuccessRule::Success,
            fallback_error: fallback_error.into(),
        }
    }

    pub fn with_rule(mut self, rule: SuccessRule) -> Self {
        self.rule = rule;
        self
    }
}

fn clamp_interval(interval: Duration) -> Duration {
    if interval < MIN_INTERVAL {
        tracing::warn!(interval_ms = interval.as_millis() as u64, "Poll interval too short, using minimum");
        MIN_INTERVAL
    } else {
        interval
    }
}

/// Cancellable data subscription
///
/// Polling is one transport behind this seam; consumers only see state.
pub trait Subscription<T>: Send + Sync {
    /// Start (or restart after [`Subscription::stop`]) delivering updates
    fn start(&self);

    /// Stop delivering; the last state stays readable
    fn stop(&self);

    fn is_active(&self) -> bool;

    fn subscribe(&self) -> watch::Receiver<FetchState<T>>;

    fn snapshot(&self) -> FetchState<T>;
}

// ============================================================================
// Remote collection
// ============================================================================

struct Inner<T> {
    http: Arc<dyn HttpClient>,
    session: SessionStore,
    spec: Mutex<PollSpec>,
    state: watch::Sender<FetchState<T>>,
    generation: AtomicU64,
    refresh: Notify,
    task: Mutex<Option<CancellationToken>>,
}

/// Polled remote resource
pub struct RemoteCollection<T> {
    inner: Arc<Inner<T>>,
}

impl<T> RemoteCollection<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create and start polling. Must run inside a tokio runtime.
    pub fn start(spec: PollSpec, http: Arc<dyn HttpClient>, session: SessionStore) -> Self {
        let collection = Self::new(spec, http, session);
        collection.spawn();
        collection
    }

    /// Create without starting
    pub fn new(spec: PollSpec, http: Arc<dyn HttpClient>, session: SessionStore) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            inner: Arc::new(Inner {
                http,
                session,
                spec: Mutex::new(spec),
                state,
                generation: AtomicU64::new(0),
                refresh: Notify::new(),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn path(&self) -> String {
        self.inner.spec.lock().unwrap_or_else(|e| e.into_inner()).path.clone()
    }

    /// Fetch now without waiting for the next tick
    pub fn refresh(&self) {
        self.inner.refresh.notify_one();
    }

    /// Switch to new parameters
    ///
    /// The old timer is cancelled before the new one starts. Data held for
    /// the old parameters is dropped and any response still on its way for
    /// them is ignored.
    pub fn set_path(&self, path: impl Into<String>) {
        let path = path.into();
        {
            let mut spec = self.inner.spec.lock().unwrap_or_else(|e| e.into_inner());
            if spec.path == path {
                return;
            }
            tracing::debug!(from = %spec.path, to = %path, "Remote collection parameters changed");
            spec.path = path;
        }
        let was_active = self.is_active();
        self.cancel_task();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.state.send_replace(FetchState::default());
        if was_active {
            self.spawn();
        }
    }

    /// Current parameter generation
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    fn cancel_task(&self) {
        if let Some(token) = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            token.cancel();
        }
    }

    fn spawn(&self) {
        let token = CancellationToken::new();
        if let Some(previous) = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(token.clone())
        {
            previous.cancel();
        }

        let inner = self.inner.clone();
        let generation = inner.generation.load(Ordering::SeqCst);
        let spec = inner.spec.lock().unwrap_or_else(|e| e.into_inner()).clone();
        tokio::spawn(async move {
            tracing::debug!(path = %spec.path, interval_ms = spec.interval.as_millis() as u64, "Polling started");
            let mut ticker = tokio::time::interval(spec.interval.max(MIN_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = inner.refresh.notified() => {}
                    _ = token.cancelled() => break,
                }

                let epoch = inner.session.epoch();
                let Some(auth) = inner.session.token() else {
                    tracing::debug!(path = %spec.path, "No session, skipping fetch");
                    continue;
                };

                let result = tokio::select! {
                    result = fetch::<T>(inner.http.as_ref(), &spec, auth) => result,
                    _ = token.cancelled() => break,
                };
                inner.apply(generation, epoch, &spec, result);
            }
            tracing::debug!(path = %spec.path, "Polling stopped");
        });
    }
}

async fn fetch<T: DeserializeOwned>(http: &dyn HttpClient, spec: &PollSpec, token: String) -> ClientResult<T> {
    let value = http
        .send(ApiRequest::get(spec.path.clone()).with_token(Some(token)))
        .await?;
    let envelope: ApiEnvelope<Value> = serde_json::from_value(value)?;
    if !spec.rule.accepts(&envelope) {
        return Err(ClientError::Api(envelope.message().map(str::to_string)));
    }
    let data = envelope
        .data
        .ok_or_else(|| ClientError::InvalidResponse("missing data".into()))?;
    Ok(serde_json::from_value(data)?)
}

impl<T: Clone> Inner<T> {
    fn apply(&self, generation: u64, epoch: u64, spec: &PollSpec, result: ClientResult<T>) {
        if generation != self.generation.load(Ordering::SeqCst) || epoch != self.session.epoch() {
            tracing::debug!(path = %spec.path, "Discarding stale response");
            return;
        }
        match result {
            Ok(data) => {
                self.state.send_modify(|state| {
                    state.data = Some(data);
                    state.loading = false;
                    state.error = None;
                    state.last_success_at = Some(shared::util::now_millis());
                });
            }
            Err(e) => {
                tracing::warn!(path = %spec.path, error = %e, "Fetch failed");
                let message = e.user_message(&spec.fallback_error);
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(message);
                });
            }
        }
    }
}

impl<T> Subscription<T> for RemoteCollection<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn start(&self) {
        if !self.is_active() {
            self.spawn();
        }
    }

    fn stop(&self) {
        self.cancel_task();
    }

    fn is_active(&self) -> bool {
        self.inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }

    fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.inner.state.subscribe()
    }

    fn snapshot(&self) -> FetchState<T> {
        self.inner.state.borrow().clone()
    }
}

impl<T> Drop for RemoteCollection<T> {
    fn drop(&mut self) {
        if let Some(token) = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeHttp, logged_in, session_fixture};
    use serde_json::json;
    use shared::Role;

    fn spec(path: &str) -> PollSpec {
        PollSpec::new(path, Duration::from_secs(1), "Failed to fetch")
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_fetch_then_interval() {
        let f = logged_in(Role::Operator);
        let http = FakeHttp::new();
        http.respond("items/", json!({"status": "success", "data": [1, 2, 3]}));

        let collection = RemoteCollection::<Vec<i64>>::start(spec("items/"), http.clone(), f.store.clone());
        let mut rx = collection.subscribe();
        rx.wait_for(|s| !s.loading).await.unwrap();
        assert_eq!(collection.snapshot().data, Some(vec![1, 2, 3]));
        assert_eq!(http.count("items/"), 1);
        assert_eq!(http.requests()[0].token.as_deref(), Some("token-1"));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(http.count("items/"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_still_polls() {
        let f = logged_in(Role::Operator);
        let http = FakeHttp::new();
        http.respond("items/", json!({"status": "success", "data": [5]}));

        let zero = PollSpec::new("items/", Duration::ZERO, "Failed to fetch");
        assert_eq!(zero.interval, MIN_INTERVAL);

        let mut raw = spec("items/");
        raw.interval = Duration::ZERO;
        for spec in [zero, raw] {
            let collection = RemoteCollection::<Vec<i64>>::start(spec, http.clone(), f.store.clone());
            collection.subscribe().wait_for(|s| !s.loading).await.unwrap();
            assert_eq!(collection.snapshot().data, Some(vec![5]));
            assert!(collection.is_active());
            collection.stop();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_last_good_data() {
        let f = logged_in(Role::Operator);
        let http = FakeHttp::new();
        http.respond("items/", json!({"status": "success", "data": [1]}));

        let collection = RemoteCollection::<Vec<i64>>::start(spec("items/"), http.clone(), f.store.clone());
        let mut rx = collection.subscribe();
        rx.wait_for(|s| s.data.is_some()).await.unwrap();

        http.respond("items/", json!({"status": "error", "message": "Department not found"}));
        rx.wait_for(|s| s.error.is_some()).await.unwrap();
        let state = collection.snapshot();
        assert_eq!(state.error.as_deref(), Some("Department not found"));
        assert_eq!(state.data, Some(vec![1]));

        http.fail("items/", 500);
        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;
        let state = collection.snapshot();
        assert_eq!(state.error.as_deref(), Some("Failed to fetch"));
        assert_eq!(state.data, Some(vec![1]));

        http.respond("items/", json!({"status": "success", "data": [2]}));
        rx.wait_for(|s| s.error.is_none()).await.unwrap();
        assert_eq!(collection.snapshot().data, Some(vec![2]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_truthy_rule() {
        let f = logged_in(Role::Operator);
        let http = FakeHttp::new();
        http.respond("board/", json!({"status": "ok", "data": [7]}));

        let strict = RemoteCollection::<Vec<i64>>::start(spec("board/"), http.clone(), f.store.clone());
        let truthy = RemoteCollection::<Vec<i64>>::start(
            spec("board/").with_rule(SuccessRule::Truthy),
            http.clone(),
            f.store.clone(),
        );
        truthy.subscribe().wait_for(|s| !s.loading).await.unwrap();
        strict.subscribe().wait_for(|s| !s.loading).await.unwrap();
        assert_eq!(truthy.snapshot().data, Some(vec![7]));
        assert_eq!(strict.snapshot().data, None);
        assert_eq!(strict.snapshot().error.as_deref(), Some("Failed to fetch"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_parameters_ignored() {
        let f = logged_in(Role::Admin);
        let http = FakeHttp::new();
        http.respond_after("log/?userid=1", Duration::from_millis(800), json!({"status": "success", "data": [1]}));
        http.respond("log/?userid=2", json!({"status": "success", "data": [2]}));

        let collection = RemoteCollection::<Vec<i64>>::start(spec("log/?userid=1"), http.clone(), f.store.clone());
        settle().await;
        assert_eq!(http.count("log/?userid=1"), 1);

        collection.set_path("log/?userid=2");
        let mut rx = collection.subscribe();
        rx.wait_for(|s| !s.loading).await.unwrap();
        assert_eq!(collection.snapshot().data, Some(vec![2]));

        // Past the point where the slow response for user 1 would have landed
        tokio::time::sleep(Duration::from_millis(900)).await;
        settle().await;
        assert_eq!(collection.snapshot().data, Some(vec![2]));
        assert_eq!(collection.generation(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_across_logout_discarded() {
        let f = logged_in(Role::Operator);
        let http = FakeHttp::new();
        http.respond_after("items/", Duration::from_millis(500), json!({"status": "success", "data": [9]}));

        let collection = RemoteCollection::<Vec<i64>>::start(spec("items/"), http.clone(), f.store.clone());
        settle().await;
        f.store.logout();

        tokio::time::sleep(Duration::from_secs(3)).await;
        settle().await;
        let state = collection.snapshot();
        assert_eq!(state.data, None);
        // No further authenticated fetches without a session
        assert_eq!(http.count("items/"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_and_stop() {
        let f = logged_in(Role::Operator);
        let http = FakeHttp::new();
        http.respond("items/", json!({"status": "success", "data": []}));

        let collection = RemoteCollection::<Vec<i64>>::start(
            PollSpec::new("items/", Duration::from_secs(10), "Failed"),
            http.clone(),
            f.store.clone(),
        );
        settle().await;
        assert_eq!(http.count("items/"), 1);

        collection.refresh();
        settle().await;
        assert_eq!(http.count("items/"), 2);

        collection.stop();
        assert!(!collection.is_active());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(http.count("items/"), 2);

        collection.start();
        settle().await;
        assert_eq!(http.count("items/"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_polling() {
        let f = session_fixture();
        f.store.login("t", crate::testing::user(1, Role::User, "3")).unwrap();
        let http = FakeHttp::new();
        http.respond("items/", json!({"status": "success", "data": []}));

        let collection = RemoteCollection::<Vec<i64>>::start(spec("items/"), http.clone(), f.store.clone());
        settle().await;
        drop(collection);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(http.count("items/"), 1);
    }
}
