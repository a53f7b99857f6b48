//! Switchboard Client - client-state layer for the Switchboard presence dashboard
//!
//! Keeps a signed-in session durable across restarts, polls the Switchboard
//! REST API for each open screen, and derives what the screens render:
//! grouped status history, sortable/filterable tables and human-readable
//! times.

pub mod access;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod poller;
pub mod push;
pub mod session;
pub mod status_log;
pub mod storage;
pub mod table;
pub mod time_format;
pub mod validation;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;

pub use access::{Access, HistoryNavigator, Navigator, Route, authorize};
pub use api::ApiClient;
pub use auth::AuthFlow;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::{ApiRequest, HttpClient, NetworkHttpClient};
pub use poller::{FetchState, PollSpec, RemoteCollection, Subscription, SuccessRule};
pub use push::{NotificationPayload, PushRegistry, PushSubscription, PushTransport};
pub use session::{Clock, Session, SessionSnapshot, SessionStore, SystemClock};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use time_format::{FormattedTime, LiveTime, TimeFormatter};
pub use views::ViewContext;

// Re-export shared types for convenience
pub use shared::{Capabilities, Role, SessionUser};
