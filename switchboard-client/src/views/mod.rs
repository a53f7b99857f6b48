//! Screen view models
//!
//! Each view owns its fetch, poll and derive cycle: it holds its
//! [`RemoteCollection`]s (torn down on drop) plus the table controls, and
//! derives what the screen renders on demand. Views are opened through an
//! access check against the session passed in with the [`ViewContext`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::access::{Access, Route, authorize};
use crate::api::ApiClient;
use crate::poller::{PollSpec, RemoteCollection};
use crate::session::{Clock, Session, SessionStore, SystemClock};
use crate::table::DepartmentVisibility;
use crate::time_format::TimeFormatter;
use crate::{ClientConfig, ClientError, ClientResult};

pub mod current_status;
pub mod dashboard;
pub mod user_detail;
pub mod users;

pub use current_status::CurrentStatusView;
pub use dashboard::{BoardRowView, DashboardView};
pub use user_detail::UserDetailView;
pub use users::UsersView;

/// Everything a view needs, passed explicitly
#[derive(Clone)]
pub struct ViewContext {
    pub api: ApiClient,
    pub config: Arc<ClientConfig>,
    pub clock: Arc<dyn Clock>,
}

impl ViewContext {
    pub fn new(api: ApiClient, config: ClientConfig) -> Self {
        Self {
            api,
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> &SessionStore {
        self.api.session()
    }

    pub fn formatter(&self) -> TimeFormatter {
        TimeFormatter::new(self.config.timezone)
    }

    pub fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.clock.now_millis()).unwrap_or_default()
    }

    /// Department rows this session may see
    pub fn visibility(&self, session: &Session) -> DepartmentVisibility {
        DepartmentVisibility::new(
            self.config.restricted_departments.clone(),
            session.capabilities().can_view_all_departments,
        )
    }

    /// Check access to `route`; on a redirect the navigator is sent there
    pub(crate) fn gate(&self, route: &Route) -> ClientResult<Session> {
        let snapshot = self.session().snapshot();
        match authorize(&snapshot, route) {
            Access::Granted => snapshot.session.ok_or(ClientError::Unauthorized),
            Access::Pending => {
                tracing::debug!(route = %route, "Session not ready");
                Err(ClientError::Unauthorized)
            }
            Access::Redirect(target) => {
                self.session().navigator().navigate(target.clone());
                match target {
                    Route::Login { unauthorized: true } => {
                        Err(ClientError::Forbidden(format!("Not allowed to open {route}")))
                    }
                    _ => Err(ClientError::Unauthorized),
                }
            }
        }
    }

    pub(crate) fn poll<T>(&self, spec: PollSpec) -> RemoteCollection<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        RemoteCollection::start(spec, self.api.http().clone(), self.session().clone())
    }
}

/// One-shot catalog load; failures leave the catalog empty with a message
pub(crate) async fn load_catalog<T>(
    what: &str,
    fetch: impl Future<Output = ClientResult<Vec<T>>>,
) -> (Vec<T>, Option<String>) {
    match fetch.await {
        Ok(items) => (items, None),
        Err(e) => {
            tracing::warn!(catalog = what, error = %e, "Failed to load catalog");
            (Vec::new(), Some(e.user_message(&format!("Failed to fetch {what}"))))
        }
    }
}
