//! Department user list and the add-user form

use shared::models::{Department, RoleOption, UserForm, UserRecord};
use shared::types::UserId;
use tokio::sync::watch;

use super::{ViewContext, load_catalog};
use crate::access::Route;
use crate::api::endpoints;
use crate::poller::{FetchState, PollSpec, RemoteCollection, Subscription};
use crate::session::Session;
use crate::table::{DepartmentVisibility, SortDirection, SortState, TableQuery, UserSortKey, derive_rows};
use crate::validation::validate_user_form;
use crate::{ClientError, ClientResult};

const FETCH_FAILED: &str = "Failed to fetch users";

/// Users of the session's department
pub struct UsersView {
    ctx: ViewContext,
    session: Session,
    users: RemoteCollection<Vec<UserRecord>>,
    departments: Vec<Department>,
    roles: Vec<RoleOption>,
    catalog_error: Option<String>,
    query: TableQuery<UserSortKey>,
    visibility: DepartmentVisibility,
}

impl UsersView {
    /// Check access, load the department and role catalogs, start polling
    pub async fn open(ctx: ViewContext) -> ClientResult<Self> {
        let session = ctx.gate(&Route::AdminUsers)?;
        let department = session
            .department()
            .ok_or_else(|| ClientError::Forbidden("No department assigned".into()))?
            .to_string();

        let users = ctx.poll(PollSpec::new(
            endpoints::users_in_department(&department),
            ctx.config.users_poll,
            FETCH_FAILED,
        ));
        let (departments, departments_error) = load_catalog("departments", ctx.api.departments()).await;
        let (roles, roles_error) = load_catalog("roles", ctx.api.roles()).await;
        let visibility = ctx.visibility(&session);

        Ok(Self {
            ctx,
            session,
            users,
            departments,
            roles,
            catalog_error: departments_error.or(roles_error),
            query: TableQuery::new(SortState::new(UserSortKey::FirstName, SortDirection::Ascending)),
            visibility,
        })
    }

    pub fn state(&self) -> FetchState<Vec<UserRecord>> {
        self.users.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<Vec<UserRecord>>> {
        self.users.subscribe()
    }

    /// Department catalog, without departments hidden from this session
    pub fn departments(&self) -> Vec<Department> {
        self.departments
            .iter()
            .filter(|d| self.visibility.allows(&d.name))
            .cloned()
            .collect()
    }

    pub fn roles(&self) -> &[RoleOption] {
        &self.roles
    }

    pub fn catalog_error(&self) -> Option<&str> {
        self.catalog_error.as_deref()
    }

    pub fn can_manage_users(&self) -> bool {
        self.session.capabilities().can_manage_users
    }

    pub fn query(&self) -> &TableQuery<UserSortKey> {
        &self.query
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.query.search = search.into();
    }

    pub fn click_sort(&mut self, key: UserSortKey) {
        self.query.sort.click(key);
    }

    pub fn filter_department(&mut self, department: Option<String>) {
        self.query.department = department;
    }

    /// Visible rows in display order
    pub fn rows(&self) -> Vec<UserRecord> {
        let data = self.users.snapshot().data.unwrap_or_default();
        derive_rows(&data, &self.query, &self.visibility, &self.ctx.formatter())
    }

    /// Create a user, then open their detail page
    ///
    /// Nothing is sent when the form is invalid or the role may not manage
    /// users.
    pub async fn add_user(&self, form: &UserForm) -> ClientResult<Option<UserId>> {
        if !self.can_manage_users() {
            return Err(ClientError::Forbidden("Only administrators can add users".into()));
        }
        validate_user_form(form, true).map_err(ClientError::Validation)?;

        let envelope = self.ctx.api.create_user(form).await?;
        tracing::info!(id = ?envelope.id, "User created");
        self.users.refresh();
        if let Some(id) = envelope.id {
            self.ctx.session().navigator().navigate(Route::AdminUser(id));
        }
        Ok(envelope.id)
    }

    pub fn refresh(&self) {
        self.users.refresh();
    }

    pub fn close(&self) {
        self.users.stop();
    }
}
