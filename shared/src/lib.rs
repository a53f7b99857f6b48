//! Shared types for the Switchboard client
//!
//! Wire types exchanged with the Switchboard REST API: the response envelope,
//! auth DTOs and the domain models (statuses, users, departments, roles).

pub mod client;
pub mod models;
pub mod response;
pub mod serde_helpers;
pub mod types;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use client::{LoginEnvelope, LoginRequest, SessionUser};
pub use models::{Capabilities, Role};
pub use response::{ApiEnvelope, MutationEnvelope};
