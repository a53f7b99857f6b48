//! Routes and client-side access control
//!
//! Screens ask [`authorize`] before mounting. While the session store is
//! still restoring, the answer is [`Access::Pending`] so nothing redirects
//! early.

use std::sync::Mutex;

use shared::Role;
use shared::types::UserId;

use crate::session::SessionSnapshot;

/// Application screens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login { unauthorized: bool },
    /// Department status board
    Dashboard,
    /// Own status page for staff with dashboard access
    MyStatus,
    /// Personal page for plain users
    UserHome,
    AdminUsers,
    AdminUser(UserId),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Login { unauthorized: false } => "/login".to_string(),
            Route::Login { unauthorized: true } => "/login?unauthorized=true".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::MyStatus => "/dashboard/status".to_string(),
            Route::UserHome => "/user".to_string(),
            Route::AdminUsers => "/admin/users".to_string(),
            Route::AdminUser(id) => format!("/admin/users/{id}"),
        }
    }

    /// Where a role lands after login
    pub fn landing(role: Role) -> Route {
        if role.capabilities().can_view_dashboard {
            Route::Dashboard
        } else {
            Route::UserHome
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Navigation seam
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Records every navigation; the last entry is the current screen
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    history: Mutex<Vec<Route>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Route> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    pub fn history(&self) -> Vec<Route> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(route = %route, "Navigate");
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(route);
    }
}

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Session restore not finished yet
    Pending,
    Granted,
    Redirect(Route),
}

/// Decide whether the current session may open `route`
pub fn authorize(snapshot: &SessionSnapshot, route: &Route) -> Access {
    if !snapshot.ready {
        return Access::Pending;
    }
    if matches!(route, Route::Login { .. }) {
        return Access::Granted;
    }
    let Some(session) = snapshot.session.as_ref() else {
        return Access::Redirect(Route::Login { unauthorized: false });
    };

    let caps = session.capabilities();
    let has_department = session.department().is_some();
    let allowed = match route {
        Route::Login { .. } | Route::UserHome => true,
        Route::Dashboard | Route::MyStatus => caps.can_view_dashboard && has_department,
        Route::AdminUsers => caps.can_view_users && has_department,
        Route::AdminUser(id) => caps.can_view_users || *id == session.user_id(),
    };

    if allowed {
        Access::Granted
    } else {
        tracing::warn!(route = %route, role = %session.role(), "Access denied");
        Access::Redirect(Route::Login { unauthorized: true })
    }
}
