//! One user's profile, status history and edit form

use shared::models::{Department, RoleOption, StatusLogEntry, UserForm, UserRecord};
use shared::types::UserId;
use tokio::sync::watch;

use super::{ViewContext, load_catalog};
use crate::access::Route;
use crate::api::endpoints;
use crate::poller::{FetchState, PollSpec, RemoteCollection, Subscription};
use crate::session::Session;
use crate::status_log::{DayGroup, group_status_log};
use crate::validation::validate_user_form;
use crate::{ClientError, ClientResult};

const USER_FAILED: &str = "Failed to fetch user";
const LOG_FAILED: &str = "Failed to fetch status log";

pub struct UserDetailView {
    ctx: ViewContext,
    session: Session,
    user_id: UserId,
    user: RemoteCollection<Vec<UserRecord>>,
    log: RemoteCollection<Vec<StatusLogEntry>>,
    departments: Vec<Department>,
    roles: Vec<RoleOption>,
    catalog_error: Option<String>,
}

impl UserDetailView {
    pub async fn open(ctx: ViewContext, user_id: UserId) -> ClientResult<Self> {
        let session = ctx.gate(&Route::AdminUser(user_id))?;

        let user = ctx.poll(PollSpec::new(
            endpoints::user(user_id),
            ctx.config.users_poll,
            USER_FAILED,
        ));
        let log = ctx.poll(PollSpec::new(
            endpoints::status_log(user_id),
            ctx.config.status_poll,
            LOG_FAILED,
        ));
        let (departments, departments_error) =
            load_catalog("departments", ctx.api.departments()).await;
        let (roles, roles_error) = load_catalog("roles", ctx.api.roles()).await;

        Ok(Self {
            ctx,
            session,
            user_id,
            user,
            log,
            departments,
            roles,
            catalog_error: departments_error.or(roles_error),
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Show another user; data held for the previous one is dropped
    pub fn set_user(&mut self, user_id: UserId) -> ClientResult<()> {
        if user_id == self.user_id {
            return Ok(());
        }
        self.session = self.ctx.gate(&Route::AdminUser(user_id))?;
        self.user_id = user_id;
        self.user.set_path(endpoints::user(user_id));
        self.log.set_path(endpoints::status_log(user_id));
        Ok(())
    }

    pub fn user_state(&self) -> FetchState<Vec<UserRecord>> {
        self.user.snapshot()
    }

    pub fn subscribe_user(&self) -> watch::Receiver<FetchState<Vec<UserRecord>>> {
        self.user.subscribe()
    }

    pub fn subscribe_log(&self) -> watch::Receiver<FetchState<Vec<StatusLogEntry>>> {
        self.log.subscribe()
    }

    /// The API answers with a list; the first row is the user
    pub fn user(&self) -> Option<UserRecord> {
        self.user.snapshot().data.and_then(|rows| rows.into_iter().next())
    }

    pub fn grouped_log(&self) -> Vec<DayGroup> {
        let entries = self.log.snapshot().data.unwrap_or_default();
        group_status_log(&entries, &self.ctx.formatter())
    }

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    pub fn roles(&self) -> &[RoleOption] {
        &self.roles
    }

    /// Department or role catalog failure, for the edit form
    pub fn catalog_error(&self) -> Option<&str> {
        self.catalog_error.as_deref()
    }

    pub fn can_edit(&self) -> bool {
        self.session.capabilities().can_manage_users
    }

    /// Edit form pre-filled from the loaded user
    ///
    /// The role id is looked up in the role catalog by name.
    pub fn edit_form(&self) -> Option<UserForm> {
        let user = self.user()?;
        let mut form = UserForm::from_record(&user);
        form.role_id = self
            .roles
            .iter()
            .find(|r| r.kind.eq_ignore_ascii_case(user.role.as_str()))
            .map(|r| r.id);
        if form.department_id.is_none() {
            form.department_id = self
                .departments
                .iter()
                .find(|d| d.name == user.department_name)
                .map(|d| d.id);
        }
        Some(form)
    }

    /// Save edits; a blank password keeps the current one
    pub async fn edit_user(&self, form: &UserForm) -> ClientResult<()> {
        if !self.can_edit() {
            return Err(ClientError::Forbidden("Only administrators can edit users".into()));
        }
        validate_user_form(form, false).map_err(ClientError::Validation)?;

        self.ctx.api.update_user(self.user_id, form).await?;
        tracing::info!(user_id = self.user_id, "User updated");
        self.user.refresh();
        Ok(())
    }

    pub fn refresh(&self) {
        self.user.refresh();
        self.log.refresh();
    }

    pub fn close(&self) {
        self.user.stop();
        self.log.stop();
    }
}
