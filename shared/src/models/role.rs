//! Role Model
//!
//! Closed set of access levels plus the capability table derived from them.
//! Access checks look capabilities up instead of comparing role strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// User role (access level)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Regular staff: own status only
    #[default]
    User,
    /// Switchboard operator: department dashboard and user list
    Operator,
    /// Department administrator: manages users
    Admin,
    /// Super user: sees every department
    Super,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Operator, Role::Admin, Role::Super];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Operator => "operator",
            Role::Admin => "admin",
            Role::Super => "super",
        }
    }

    /// Parse leniently: unknown or empty values fall back to [`Role::User`]
    pub fn from_lossy(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            if !value.trim().is_empty() {
                tracing::warn!(role = %value, "Unknown role, treating as user");
            }
            Role::User
        })
    }

    /// Capability table for this role
    pub const fn capabilities(&self) -> Capabilities {
        match self {
            Role::User => Capabilities {
                can_view_dashboard: false,
                can_view_users: false,
                can_manage_users: false,
                can_view_all_departments: false,
            },
            Role::Operator => Capabilities {
                can_view_dashboard: true,
                can_view_users: true,
                can_manage_users: false,
                can_view_all_departments: false,
            },
            Role::Admin => Capabilities {
                can_view_dashboard: true,
                can_view_users: true,
                can_manage_users: true,
                can_view_all_departments: false,
            },
            Role::Super => Capabilities {
                can_view_dashboard: true,
                can_view_users: true,
                can_manage_users: true,
                can_view_all_departments: true,
            },
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "operator" => Ok(Role::Operator),
            "admin" => Ok(Role::Admin),
            "super" => Ok(Role::Super),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Role::from_lossy).unwrap_or_default())
    }
}

/// What a role may do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Department status board (and landing there after login)
    pub can_view_dashboard: bool,
    /// Read-only user list
    pub can_view_users: bool,
    /// Add and edit users
    pub can_manage_users: bool,
    /// See users from restricted departments (e.g. IT)
    pub can_view_all_departments: bool,
}

/// Role catalog entry (`GET users/roles/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOption {
    #[serde(deserialize_with = "crate::serde_helpers::i64_flexible")]
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capability_table() {
        assert!(!Role::User.capabilities().can_view_dashboard);
        assert!(Role::Operator.capabilities().can_view_dashboard);
        assert!(!Role::Operator.capabilities().can_manage_users);
        assert!(Role::Admin.capabilities().can_manage_users);
        assert!(!Role::Admin.capabilities().can_view_all_departments);
        assert!(Role::Super.capabilities().can_view_all_departments);
    }

    #[test]
    fn test_parse_roles() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" Super ".parse::<Role>(), Ok(Role::Super));
        assert!("root".parse::<Role>().is_err());
        assert_eq!(Role::from_lossy("root"), Role::User);
    }

    #[test]
    fn test_role_serde() {
        let role: Role = serde_json::from_value(json!("operator")).unwrap();
        assert_eq!(role, Role::Operator);
        let role: Role = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(role, Role::User);
        assert_eq!(serde_json::to_value(Role::Super).unwrap(), json!("super"));
    }

    #[test]
    fn test_role_option_type_field() {
        let opt: RoleOption = serde_json::from_value(json!({"id": "2", "type": "admin"})).unwrap();
        assert_eq!(opt.id, 2);
        assert_eq!(opt.kind, "admin");
    }
}
