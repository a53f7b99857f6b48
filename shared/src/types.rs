//! Common types for the shared crate

/// Timestamp type (Unix milliseconds)
pub type Timestamp = i64;

/// User id as issued by the API
pub type UserId = i64;

/// Department id; the API mixes numeric and string forms, so it is kept as text
pub type DepartmentId = String;
