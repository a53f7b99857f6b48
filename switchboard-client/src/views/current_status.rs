//! The signed-in user's own status page

use std::sync::Arc;

use chrono::{SecondsFormat, TimeDelta};
use shared::models::{CurrentStatus, StatusLogEntry, StatusOption, StatusUpdate};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{ViewContext, load_catalog};
use crate::access::Route;
use crate::api::endpoints;
use crate::poller::{FetchState, PollSpec, RemoteCollection, Subscription};
use crate::session::Session;
use crate::status_log::{DayGroup, group_status_log};
use crate::time_format::{FormattedTime, LiveTime};
use crate::validation::FieldErrors;
use crate::{ClientError, ClientResult};

const CURRENT_FAILED: &str = "Failed to fetch current status";
const LOG_FAILED: &str = "Failed to fetch status log";

/// How long a new status is scheduled to last
const STATUS_WINDOW: TimeDelta = TimeDelta::hours(1);

/// Current status, status catalog and change history of the session user
pub struct CurrentStatusView {
    ctx: ViewContext,
    session: Session,
    current: RemoteCollection<Vec<CurrentStatus>>,
    log: RemoteCollection<Vec<StatusLogEntry>>,
    statuses: Vec<StatusOption>,
    catalog_error: Option<String>,
    live: Arc<LiveTime>,
    follower: CancellationToken,
}

impl CurrentStatusView {
    /// Open for whoever is signed in
    pub async fn open(ctx: ViewContext) -> ClientResult<Self> {
        let session = ctx.gate(&Route::UserHome)?;
        let user_id = session.user_id();
        let interval = ctx.config.status_poll;

        let current: RemoteCollection<Vec<CurrentStatus>> = ctx.poll(PollSpec::new(
            endpoints::current_status(user_id),
            interval,
            CURRENT_FAILED,
        ));
        let log = ctx.poll(PollSpec::new(endpoints::status_log(user_id), interval, LOG_FAILED));
        let (statuses, catalog_error) = load_catalog("statuses", ctx.api.status_catalog()).await;

        let mut updates = current.subscribe();
        let initial = effective_timestamp(&updates.borrow_and_update());
        let live = Arc::new(LiveTime::start(ctx.formatter(), ctx.clock.clone(), initial));
        let follower = follow_current(updates, live.clone());

        tracing::info!(user_id, "Status page opened");
        Ok(Self {
            ctx,
            session,
            current,
            log,
            statuses,
            catalog_error,
            live,
            follower,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn statuses(&self) -> &[StatusOption] {
        &self.statuses
    }

    pub fn catalog_error(&self) -> Option<&str> {
        self.catalog_error.as_deref()
    }

    pub fn current_state(&self) -> FetchState<Vec<CurrentStatus>> {
        self.current.snapshot()
    }

    pub fn log_state(&self) -> FetchState<Vec<StatusLogEntry>> {
        self.log.snapshot()
    }

    pub fn subscribe_current(&self) -> watch::Receiver<FetchState<Vec<CurrentStatus>>> {
        self.current.subscribe()
    }

    pub fn subscribe_log(&self) -> watch::Receiver<FetchState<Vec<StatusLogEntry>>> {
        self.log.subscribe()
    }

    /// The authoritative current status (first row)
    pub fn current_status(&self) -> Option<CurrentStatus> {
        self.current
            .snapshot()
            .data
            .and_then(|rows| rows.into_iter().next())
    }

    /// Log grouped by day, newest first
    pub fn grouped_log(&self) -> Vec<DayGroup> {
        let entries = self.log.snapshot().data.unwrap_or_default();
        group_status_log(&entries, &self.ctx.formatter())
    }

    /// Once-a-second rendering of the current status timestamp
    pub fn live_time(&self) -> watch::Receiver<FormattedTime> {
        self.live.subscribe()
    }

    /// Switch to `status_id` with an optional note, then refetch
    pub async fn update_status(&self, status_id: i64, note: &str) -> ClientResult<()> {
        if !self.statuses.is_empty() && !self.statuses.iter().any(|s| s.id == status_id) {
            let mut errors = FieldErrors::new();
            errors.push("status_id", "Please select a status");
            return Err(ClientError::Validation(errors));
        }

        let now = self.ctx.now();
        let user_id = self.session.user_id();
        let update = StatusUpdate {
            user_id,
            current_status_id: self.current_status().map(|s| s.id),
            updated_by: user_id,
            updated_at: now
                .with_timezone(&self.ctx.formatter().timezone())
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            status_id,
            note: note.trim().to_string(),
            start_time: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            end_time: (now + STATUS_WINDOW).to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        self.ctx.api.update_current_status(&update).await?;
        tracing::info!(user_id, status_id, "Status updated");
        self.refresh();
        Ok(())
    }

    pub fn refresh(&self) {
        self.current.refresh();
        self.log.refresh();
    }

    pub fn close(&self) {
        self.current.stop();
        self.log.stop();
        self.follower.cancel();
        self.live.stop();
    }
}

impl Drop for CurrentStatusView {
    fn drop(&mut self) {
        self.follower.cancel();
    }
}

fn effective_timestamp(state: &FetchState<Vec<CurrentStatus>>) -> Option<String> {
    state
        .data
        .as_ref()
        .and_then(|rows| rows.first())
        .map(|s| s.effective_timestamp().to_string())
}

/// Keep the live clock pointed at the latest current status
fn follow_current(
    mut updates: watch::Receiver<FetchState<Vec<CurrentStatus>>>,
    live: Arc<LiveTime>,
) -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = cancel.cancelled() => return,
            }
            let raw = effective_timestamp(&updates.borrow_and_update());
            live.set_timestamp(raw);
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::fixtures::{settle, view_fixture};
    use http::Method;
    use serde_json::json;
    use shared::Role;
    use std::time::Duration;

    // NOW is 2025-06-15 15:06:40 UTC
    fn seed(http: &crate::testing::FakeHttp) {
        http.respond(
            "status/current/?userid=1",
            json!({"status": "success", "data": [
                {"id": 40, "status_name": "On Lunch", "status_note": "Back at 3",
                 "start_time": "2025-06-15 15:00:00", "end_time": "2025-06-15 16:00:00",
                 "created_at": "2025-06-15 14:00:00", "updated_at": "2025-06-15 15:01:40"},
                {"id": 39, "status_name": "Available", "created_at": "2025-06-15 09:00:00"}
            ]}),
        );
        http.respond(
            "status/log/?userid=1",
            json!({"status": "success", "data": [
                {"id": 1, "status_name": "Available", "created_at": "2025-06-14 08:00:00"},
                {"id": 2, "status_name": "Available", "created_at": "2025-06-15 09:00:00"},
                {"id": 3, "status_name": "On Lunch", "created_at": "2025-06-15 15:01:40"}
            ]}),
        );
        http.respond(
            "status/",
            json!({"status": "success", "data": [{"id": 1, "name": "Available"}, {"id": 2, "name": "On Lunch"}]}),
        );
    }

    async fn open_loaded(f: &crate::views::fixtures::ViewFixture) -> CurrentStatusView {
        let view = CurrentStatusView::open(f.ctx.clone()).await.unwrap();
        view.subscribe_current().wait_for(|s| !s.loading).await.unwrap();
        view.subscribe_log().wait_for(|s| !s.loading).await.unwrap();
        view
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_status_is_first_row() {
        let f = view_fixture(Role::User);
        seed(&f.http);
        let view = open_loaded(&f).await;

        let current = view.current_status().unwrap();
        assert_eq!(current.id, 40);
        assert_eq!(current.note.as_deref(), Some("Back at 3"));
        assert_eq!(view.statuses().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grouped_log() {
        let f = view_fixture(Role::User);
        seed(&f.http);
        let view = open_loaded(&f).await;

        let groups = view.grouped_log();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key(), "2025-06-15");
        assert_eq!(groups[0].entries[0].duration.label(), "Currently active");
        assert_eq!(groups[0].entries[1].duration.label(), "6 hours");
        assert_eq!(groups[1].label(), "June 14, 2025 (1 status change)");
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_time_follows_clock() {
        let f = view_fixture(Role::User);
        seed(&f.http);
        let view = open_loaded(&f).await;

        let mut live = view.live_time();
        live.wait_for(|t| t.relative == "5 minutes ago").await.unwrap();
        assert_eq!(live.borrow().absolute, "Jun 15, 2025, 3:01:40 PM");

        f.session.clock.advance(Duration::from_secs(60 * 60));
        tokio::time::sleep(LiveTime::REFRESH).await;
        settle().await;
        assert_eq!(view.live_time().borrow().relative, "1 hour ago");
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_status_posts_and_refreshes() {
        let f = view_fixture(Role::User);
        seed(&f.http);
        f.http.respond("status/current/", json!({"status": "success", "message": "Updated"}));
        let view = open_loaded(&f).await;
        let before = f.http.count("status/log/?userid=1");

        view.update_status(1, "  In the office ").await.unwrap();
        settle().await;

        let post = f
            .http
            .requests()
            .into_iter()
            .find(|r| r.method == Method::POST)
            .unwrap();
        assert_eq!(
            post.body.unwrap(),
            json!({
                "user_id": 1,
                "current_status_id": 40,
                "updated_by": 1,
                "updated_at": "2025-06-15 15:06:40",
                "status_id": 1,
                "note": "In the office",
                "start_time": "2025-06-15T15:06:40.000Z",
                "end_time": "2025-06-15T16:06:40.000Z"
            })
        );
        assert_eq!(f.http.count("status/log/?userid=1"), before + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_not_sent() {
        let f = view_fixture(Role::User);
        seed(&f.http);
        let view = open_loaded(&f).await;

        let err = view.update_status(99, "").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(f.http.requests().iter().all(|r| r.method == Method::GET));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_update_surfaces_message() {
        let f = view_fixture(Role::User);
        seed(&f.http);
        f.http.respond("status/current/", json!({"status": "error", "message": "Status locked"}));
        let view = open_loaded(&f).await;

        let err = view.update_status(2, "").await.unwrap_err();
        assert_eq!(err.user_message("Failed to update status"), "Status locked");
    }

    #[tokio::test]
    async fn test_requires_session() {
        let f = view_fixture(Role::User);
        f.session.store.logout();
        let err = CurrentStatusView::open(f.ctx.clone()).await.err().unwrap();
        assert!(matches!(err, ClientError::Unauthorized));
        assert_eq!(
            f.session.navigator.current(),
            Some(Route::Login { unauthorized: false })
        );
    }
}
