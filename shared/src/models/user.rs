//! User Model

use serde::{Deserialize, Serialize};

use super::Role;
use crate::types::UserId;

/// User record (`GET users/?departmentid=` / `GET users/?userid=`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(deserialize_with = "crate::serde_helpers::i64_flexible")]
    pub user_id: UserId,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub first_name: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub last_name: String,
    #[serde(rename = "extension_number", default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub extension: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub email: String,
    #[serde(rename = "user_role", default)]
    pub role: Role,
    #[serde(default, deserialize_with = "crate::serde_helpers::option_i64_flexible")]
    pub department_id: Option<i64>,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub department_name: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::string_or_null")]
    pub created_at: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::option_text", skip_serializing_if = "Option::is_none")]
    pub cellphone: Option<String>,
    #[serde(default, deserialize_with = "crate::serde_helpers::option_text", skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
}

impl UserRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Add/edit user payload (`POST users/`, `PUT users/`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserForm {
    /// Set for edits, absent for creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "extension_number")]
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cellphone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
    /// Required on creation, optional on edit (blank keeps the current one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub department_id: Option<i64>,
    pub role_id: Option<i64>,
}

impl UserForm {
    /// Pre-fill an edit form from an existing record
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            user_id: Some(record.user_id),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            extension: record.extension.clone(),
            cellphone: record.cellphone.clone(),
            telephone: record.telephone.clone(),
            password: None,
            department_id: record.department_id,
            role_id: None,
        }
    }
}
