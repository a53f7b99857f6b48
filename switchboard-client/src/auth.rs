//! Login and logout flows

use crate::access::Route;
use crate::api::ApiClient;
use crate::validation::validate_login;
use crate::{ClientError, ClientResult};

const LOGIN_FAILED: &str = "Login failed";

/// Login/logout orchestration over [`ApiClient`] and the session store
#[derive(Debug, Clone)]
pub struct AuthFlow {
    api: ApiClient,
}

impl AuthFlow {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Validate, authenticate and start the session
    ///
    /// Returns the landing route for the user's role; the navigator is sent
    /// there as well.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Route> {
        validate_login(email, password).map_err(ClientError::Validation)?;

        let envelope = self.api.login(email, password).await?;
        if !envelope.is_success() {
            let message = envelope.message().unwrap_or(LOGIN_FAILED).to_string();
            tracing::warn!(email = %email.trim(), message = %message, "Login rejected");
            return Err(ClientError::Api(Some(message)));
        }

        let (Some(token), Some(user)) = (envelope.token, envelope.user) else {
            return Err(ClientError::InvalidResponse(
                "login response without token or user".into(),
            ));
        };
        if token.is_empty() {
            return Err(ClientError::InvalidResponse("empty token".into()));
        }

        let session = self.api.session().login(token, user)?;
        let route = Route::landing(session.role());
        self.api.session().navigator().navigate(route.clone());
        Ok(route)
    }

    /// Best-effort server logout, then the local logout
    pub async fn logout(&self) {
        if let Some(session) = self.api.session().session()
            && let Err(e) = self.api.logout(session.user_id()).await
        {
            tracing::warn!(error = %e, "Server logout failed");
        }
        self.api.session().logout();
    }
}
