//! Data models
//!
//! Records returned by the Switchboard API. Field names follow the API's
//! snake_case JSON; ids accept both numeric and string encodings.

pub mod department;
pub mod role;
pub mod status;
pub mod user;

// Re-exports
pub use department::*;
pub use role::*;
pub use status::*;
pub use user::*;
