//! Typed Switchboard API
//!
//! Thin typed layer over [`HttpClient`]: builds paths, attaches the session
//! token and unwraps the `{ status, message, data }` envelope.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::models::{
    CurrentStatus, Department, RoleOption, StatusBoardRow, StatusLogEntry, StatusOption, StatusUpdate,
    UserForm, UserRecord,
};
use shared::types::UserId;
use shared::{ApiEnvelope, LoginEnvelope, LoginRequest, MutationEnvelope};

use crate::http::{ApiRequest, HttpClient, NetworkHttpClient};
use crate::session::SessionStore;
use crate::{ClientConfig, ClientError, ClientResult};

/// Endpoint paths, relative to the API base URL
pub mod endpoints {
    use shared::types::UserId;

    pub const LOGIN: &str = "auth/login/";
    pub const USERS: &str = "users/";
    pub const DEPARTMENTS: &str = "users/departments/";
    pub const ROLES: &str = "users/roles/";
    pub const STATUS_CATALOG: &str = "status/";
    pub const CURRENT_STATUS: &str = "status/current/";

    pub fn logout(user_id: UserId) -> String {
        format!("auth/logout/?userid={user_id}")
    }

    pub fn users_in_department(department: &str) -> String {
        format!("users/?departmentid={department}")
    }

    pub fn user(user_id: UserId) -> String {
        format!("users/?userid={user_id}")
    }

    pub fn current_status(user_id: UserId) -> String {
        format!("status/current/?userid={user_id}")
    }

    pub fn department_statuses(department: &str) -> String {
        format!("status/current/?departmentid={department}")
    }

    pub fn status_log(user_id: UserId) -> String {
        format!("status/log/?userid={user_id}")
    }
}

/// Switchboard API client
#[derive(Clone)]
pub struct ApiClient {
    http: Arc<dyn HttpClient>,
    session: SessionStore,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("session", &self.session).finish()
    }
}

impl ApiClient {
    pub fn new(http: Arc<dyn HttpClient>, session: SessionStore) -> Self {
        Self { http, session }
    }

    /// Client over the network transport
    pub fn from_config(config: &ClientConfig, session: SessionStore) -> ClientResult<Self> {
        Ok(Self::new(Arc::new(NetworkHttpClient::new(config)?), session))
    }

    pub fn http(&self) -> &Arc<dyn HttpClient> {
        &self.http
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    // ========== Auth ==========

    /// `POST auth/login/`; the caller interprets the envelope
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<LoginEnvelope> {
        let body = serde_json::to_value(LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        })?;
        let value = self.http.send(ApiRequest::post(endpoints::LOGIN, Some(body))).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `POST auth/logout/?userid=`
    pub async fn logout(&self, user_id: UserId) -> ClientResult<()> {
        let request = ApiRequest::post(endpoints::logout(user_id), None).with_token(self.session.token());
        self.http.send(request).await?;
        Ok(())
    }

    // ========== Users ==========

    pub async fn users_in_department(&self, department: &str) -> ClientResult<Vec<UserRecord>> {
        self.get(&endpoints::users_in_department(department)).await
    }

    /// One user; the API answers with a list
    pub async fn user(&self, user_id: UserId) -> ClientResult<Option<UserRecord>> {
        let users: Vec<UserRecord> = self.get(&endpoints::user(user_id)).await?;
        Ok(users.into_iter().next())
    }

    /// `POST users/`
    pub async fn create_user(&self, form: &UserForm) -> ClientResult<MutationEnvelope> {
        let mut form = form.clone();
        form.user_id = None;
        self.mutate(ApiRequest::post(endpoints::USERS, Some(serde_json::to_value(&form)?)))
            .await
    }

    /// `PUT users/`
    pub async fn update_user(&self, user_id: UserId, form: &UserForm) -> ClientResult<MutationEnvelope> {
        let mut form = form.clone();
        form.user_id = Some(user_id);
        if form.password.as_deref().is_some_and(str::is_empty) {
            form.password = None;
        }
        self.mutate(ApiRequest::put(endpoints::USERS, serde_json::to_value(&form)?))
            .await
    }

    pub async fn departments(&self) -> ClientResult<Vec<Department>> {
        self.get(endpoints::DEPARTMENTS).await
    }

    pub async fn roles(&self) -> ClientResult<Vec<RoleOption>> {
        self.get(endpoints::ROLES).await
    }

    // ========== Status ==========

    pub async fn status_catalog(&self) -> ClientResult<Vec<StatusOption>> {
        self.get(endpoints::STATUS_CATALOG).await
    }

    /// Newest first; index 0 is authoritative
    pub async fn current_status(&self, user_id: UserId) -> ClientResult<Vec<CurrentStatus>> {
        self.get(&endpoints::current_status(user_id)).await
    }

    pub async fn department_statuses(&self, department: &str) -> ClientResult<Vec<StatusBoardRow>> {
        self.get(&endpoints::department_statuses(department)).await
    }

    /// `POST status/current/`
    pub async fn update_current_status(&self, update: &StatusUpdate) -> ClientResult<MutationEnvelope> {
        self.mutate(ApiRequest::post(endpoints::CURRENT_STATUS, Some(serde_json::to_value(update)?)))
            .await
    }

    pub async fn status_log(&self, user_id: UserId) -> ClientResult<Vec<StatusLogEntry>> {
        self.get(&endpoints::status_log(user_id)).await
    }

    // ========== Internals ==========

    /// Token of the current session, or `Unauthorized`
    fn auth(&self) -> ClientResult<(String, u64)> {
        let epoch = self.session.epoch();
        self.session
            .token()
            .map(|token| (token, epoch))
            .ok_or(ClientError::Unauthorized)
    }

    /// Responses that complete across a login or logout are not delivered
    fn check_epoch(&self, epoch: u64) -> ClientResult<()> {
        if self.session.epoch() != epoch {
            tracing::debug!("Session changed during request, dropping response");
            return Err(ClientError::Unauthorized);
        }
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let (token, epoch) = self.auth()?;
        let value = self
            .http
            .send(ApiRequest::get(path).with_token(Some(token)))
            .await?;
        self.check_epoch(epoch)?;

        let envelope: ApiEnvelope<Value> = serde_json::from_value(value)?;
        if !envelope.is_success() {
            return Err(ClientError::Api(envelope.message().map(str::to_string)));
        }
        let data = envelope
            .data
            .ok_or_else(|| ClientError::InvalidResponse(format!("{path}: missing data")))?;
        Ok(serde_json::from_value(data)?)
    }

    async fn mutate(&self, request: ApiRequest) -> ClientResult<MutationEnvelope> {
        let (token, epoch) = self.auth()?;
        let path = request.path.clone();
        let value = self.http.send(request.with_token(Some(token))).await?;
        self.check_epoch(epoch)?;

        let envelope: MutationEnvelope = serde_json::from_value(value)?;
        if !envelope.is_success() {
            tracing::warn!(path = %path, message = ?envelope.message(), "Mutation rejected");
            return Err(ClientError::Api(envelope.message().map(str::to_string)));
        }
        Ok(envelope)
    }
}
