//! Client-related types
//!
//! Auth request/response types used by the login flow and persisted by the
//! session store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Role;
use crate::response::status_is_success;
use crate::types::UserId;

// =============================================================================
// Auth API DTOs
// =============================================================================

/// Login request (`POST auth/login/`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
///
/// Unlike the other endpoints, `token` and `user` sit at the top level
/// instead of under `data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginEnvelope {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl LoginEnvelope {
    pub fn is_success(&self) -> bool {
        status_is_success(self.status.as_ref())
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// Authenticated identity (the `sessionUser` durable entry; the token is kept apart)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(deserialize_with = "crate::serde_helpers::i64_flexible")]
    pub id: UserId,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub name: String,
    #[serde(default)]
    pub user_role: Role,
    /// Department id
    #[serde(
        default,
        deserialize_with = "crate::serde_helpers::option_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub department: Option<String>,
}

impl SessionUser {
    pub fn role(&self) -> Role {
        self.user_role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_login_payload() {
        let env: LoginEnvelope = serde_json::from_value(json!({
            "status": "success",
            "token": "abc",
            "user": { "id": 1, "user_role": "admin" }
        }))
        .unwrap();
        assert!(env.is_success());
        assert_eq!(env.token.as_deref(), Some("abc"));
        let user = env.user.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.user_role, Role::Admin);
        assert_eq!(user.name, "");
        assert_eq!(user.department, None);
    }

    #[test]
    fn test_failed_login_payload() {
        let env: LoginEnvelope = serde_json::from_value(json!({
            "status": "error",
            "message": "Invalid credentials"
        }))
        .unwrap();
        assert!(!env.is_success());
        assert_eq!(env.message(), Some("Invalid credentials"));
        assert!(env.user.is_none());
    }

    #[test]
    fn test_session_user_round_trips_through_storage_form() {
        let user = SessionUser {
            id: 9,
            name: "Thandi".into(),
            user_role: Role::Operator,
            department: Some("4".into()),
        };
        let raw = serde_json::to_string(&user).unwrap();
        let back: SessionUser = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, user);
    }
}
