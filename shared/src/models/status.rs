//! Status Models
//!
//! Presence statuses ("Available", "On Lunch", ...), the per-user current
//! status, the status change log and the department status board.
//! Timestamps are kept as the raw strings the API emits
//! (`2025-05-30 12:39:12` or ISO 8601); parsing happens client-side.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Status catalog entry (`GET status/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOption {
    #[serde(deserialize_with = "crate::serde_helpers::i64_flexible")]
    pub id: i64,
    pub name: String,
}

/// One historical status change (`GET status/log/?userid=`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLogEntry {
    #[serde(deserialize_with = "crate::serde_helpers::i64_flexible")]
    pub id: i64,
    pub status_name: String,
    #[serde(
        rename = "status_note",
        default,
        deserialize_with = "crate::serde_helpers::option_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub start_time: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub end_time: String,
    pub created_at: String,
}

/// A user's active status (`GET status/current/?userid=`)
///
/// The endpoint returns a short list; index 0 is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentStatus {
    #[serde(deserialize_with = "crate::serde_helpers::i64_flexible")]
    pub id: i64,
    pub status_name: String,
    #[serde(
        rename = "status_note",
        default,
        deserialize_with = "crate::serde_helpers::option_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub start_time: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub end_time: String,
    pub created_at: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::option_text")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "crate::serde_helpers::option_string_or_number")]
    pub current_status_id: Option<String>,
    #[serde(
        rename = "updated_by",
        default,
        deserialize_with = "crate::serde_helpers::option_i64_flexible"
    )]
    pub updated_by_user_id: Option<UserId>,
}

impl CurrentStatus {
    /// Timestamp shown on the live clock: last update, else creation
    pub fn effective_timestamp(&self) -> &str {
        self.updated_at.as_deref().unwrap_or(&self.created_at)
    }
}

/// One row of the department status board (`GET status/current/?departmentid=`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBoardRow {
    #[serde(deserialize_with = "crate::serde_helpers::i64_flexible")]
    pub id: i64,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub user_first_name: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub user_last_name: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub extension_number: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub email: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub department_name: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub status_name: String,
    #[serde(
        rename = "status_note",
        default,
        deserialize_with = "crate::serde_helpers::option_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<String>,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub updated_at: String,
}

impl StatusBoardRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.user_first_name, self.user_last_name)
            .trim()
            .to_string()
    }
}

/// Current-status write payload (`POST status/current/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub user_id: UserId,
    /// Id of the current-status row being replaced, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_status_id: Option<i64>,
    pub updated_by: UserId,
    /// Local wall-clock time, `YYYY-MM-DD HH:MM:SS`
    pub updated_at: String,
    pub status_id: i64,
    pub note: String,
    /// RFC 3339
    pub start_time: String,
    /// RFC 3339
    pub end_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_current_status_from_api() {
        let status: CurrentStatus = serde_json::from_value(json!({
            "id": 3,
            "status_name": "On Lunch",
            "status_note": "",
            "start_time": "2025-05-30 12:00:00",
            "end_time": "2025-05-30 13:00:00",
            "created_at": "2025-05-30 12:00:00",
            "updated_at": null,
            "current_status_id": "17",
            "updated_by": "4"
        }))
        .unwrap();
        assert_eq!(status.note, None);
        assert_eq!(status.effective_timestamp(), "2025-05-30 12:00:00");
        assert_eq!(status.current_status_id.as_deref(), Some("17"));
        assert_eq!(status.updated_by_user_id, Some(4));
    }

    #[test]
    fn test_board_row_full_name() {
        let row: StatusBoardRow = serde_json::from_value(json!({
            "id": 1,
            "user_first_name": "Lerato",
            "user_last_name": null,
            "extension_number": 204,
            "status_name": "Available",
            "updated_at": "2025-05-30 08:00:00"
        }))
        .unwrap();
        assert_eq!(row.full_name(), "Lerato");
        assert_eq!(row.extension_number, "204");
        assert_eq!(row.department_name, "");
    }

    #[test]
    fn test_status_update_omits_missing_current_id() {
        let update = StatusUpdate {
            user_id: 4,
            current_status_id: None,
            updated_by: 4,
            updated_at: "2025-05-30 12:00:00".into(),
            status_id: 2,
            note: String::new(),
            start_time: "2025-05-30T10:00:00Z".into(),
            end_time: "2025-05-30T11:00:00Z".into(),
        };
        let value = serde_json::to_value(&update).unwrap();
        assert!(value.get("current_status_id").is_none());
        assert_eq!(value["status_id"], json!(2));
    }
}
