//! API Response types
//!
//! Every Switchboard endpoint answers with the same envelope:
//! ```json
//! {
//!     "status": "success",
//!     "message": "Users fetched successfully.",
//!     "data": [ ... ]
//! }
//! ```
//! Error responses carry a falsy `status` and a human-readable `message`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status string reported by successful calls
pub const STATUS_SUCCESS: &str = "success";

/// Unified API response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// `"success"`, `"error"`, a boolean, or absent depending on the endpoint
    #[serde(default)]
    pub status: Option<Value>,
    /// Human-readable message (mostly present on errors)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Strict success check: `"success"` or `true`
    pub fn is_success(&self) -> bool {
        status_is_success(self.status.as_ref())
    }

    /// Loose success check used by the department dashboard endpoint
    pub fn is_truthy(&self) -> bool {
        status_is_truthy(self.status.as_ref())
    }

    /// Server message, if non-empty
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// Response to create/update calls (`POST users/`, `PUT users/`, `POST status/current/`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutationEnvelope {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Id of the created or updated record
    #[serde(
        default,
        deserialize_with = "crate::serde_helpers::option_i64_flexible",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
}

impl MutationEnvelope {
    pub fn is_success(&self) -> bool {
        status_is_success(self.status.as_ref())
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

pub(crate) fn status_is_success(status: Option<&Value>) -> bool {
    match status {
        Some(Value::String(s)) => s == STATUS_SUCCESS,
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

pub(crate) fn status_is_truthy(status: Option<&Value>) -> bool {
    match status {
        Some(Value::String(s)) => {
            let s = s.trim();
            !s.is_empty() && !s.eq_ignore_ascii_case("error") && !s.eq_ignore_ascii_case("fail")
        }
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }
}
