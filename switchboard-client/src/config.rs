//! Client configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | SWITCHBOARD_API_URL | http://localhost:8080/switchboard/api/public/index.php | API base URL |
//! | SWITCHBOARD_STORAGE_DIR | ./.switchboard | Durable session storage directory |
//! | SWITCHBOARD_TIMEZONE | Africa/Johannesburg | Zone for backend wall-clock timestamps |
//! | SWITCHBOARD_REQUEST_TIMEOUT_SECS | 30 | HTTP timeout |
//! | SWITCHBOARD_SESSION_EXPIRY_SECS | 36000 | Absolute session lifetime (10 h) |
//! | SWITCHBOARD_DASHBOARD_POLL_MS | 1000 | Department status board poll |
//! | SWITCHBOARD_USERS_POLL_MS | 10000 | User list poll |
//! | SWITCHBOARD_STATUS_POLL_MS | 5000 | Own status / log poll |
//! | SWITCHBOARD_RESTRICTED_DEPARTMENTS | IT | Comma-separated departments hidden from non-super roles |
//! | SWITCHBOARD_LOG_LEVEL | info | Log level |
//! | SWITCHBOARD_LOG_DIR | (unset) | Daily rolling log directory |
//!
//! A poll interval of 0 is ignored with a warning.

use chrono_tz::Tz;
use std::path::PathBuf;
use std::time::Duration;

/// Absolute session lifetime
pub const DEFAULT_SESSION_EXPIRY: Duration = Duration::from_secs(10 * 60 * 60);

/// Client configuration for the Switchboard API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Directory holding the durable session document
    pub storage_dir: PathBuf,

    /// Time zone the backend's zone-less timestamps are expressed in
    pub timezone: Tz,

    /// Session lifetime measured from login
    pub session_expiry: Duration,

    /// Department status board poll interval
    pub dashboard_poll: Duration,

    /// User list poll interval
    pub users_poll: Duration,

    /// Own status and status log poll interval
    pub status_poll: Duration,

    /// Departments hidden from roles without `can_view_all_departments`
    pub restricted_departments: Vec<String>,

    /// Log level (trace/debug/info/warn/error)
    pub log_level: String,

    /// Rolling log file directory
    pub log_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: 30,
            storage_dir: PathBuf::from(".switchboard"),
            timezone: chrono_tz::Africa::Johannesburg,
            session_expiry: DEFAULT_SESSION_EXPIRY,
            dashboard_poll: Duration::from_millis(1000),
            users_poll: Duration::from_millis(10_000),
            status_poll: Duration::from_millis(5000),
            restricted_departments: vec!["IT".to_string()],
            log_level: "info".to_string(),
            log_dir: None,
        }
    }

    /// Load configuration from environment variables
    ///
    /// Unset or unparseable variables keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::new(
            std::env::var("SWITCHBOARD_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080/switchboard/api/public/index.php".into()),
        );

        if let Ok(dir) = std::env::var("SWITCHBOARD_STORAGE_DIR") {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Ok(tz) = std::env::var("SWITCHBOARD_TIMEZONE") {
            match tz.parse::<Tz>() {
                Ok(parsed) => config.timezone = parsed,
                Err(e) => tracing::warn!(timezone = %tz, error = %e, "Invalid time zone, keeping default"),
            }
        }
        if let Some(secs) = env_parse::<u64>("SWITCHBOARD_REQUEST_TIMEOUT_SECS") {
            config.timeout = secs;
        }
        if let Some(secs) = env_parse::<u64>("SWITCHBOARD_SESSION_EXPIRY_SECS") {
            config.session_expiry = Duration::from_secs(secs);
        }
        config.dashboard_poll = poll_interval(
            "SWITCHBOARD_DASHBOARD_POLL_MS",
            env_parse("SWITCHBOARD_DASHBOARD_POLL_MS"),
            config.dashboard_poll,
        );
        config.users_poll = poll_interval(
            "SWITCHBOARD_USERS_POLL_MS",
            env_parse("SWITCHBOARD_USERS_POLL_MS"),
            config.users_poll,
        );
        config.status_poll = poll_interval(
            "SWITCHBOARD_STATUS_POLL_MS",
            env_parse("SWITCHBOARD_STATUS_POLL_MS"),
            config.status_poll,
        );
        if let Ok(list) = std::env::var("SWITCHBOARD_RESTRICTED_DEPARTMENTS") {
            config.restricted_departments = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(level) = std::env::var("SWITCHBOARD_LOG_LEVEL") {
            config.log_level = level;
        }
        config.log_dir = std::env::var("SWITCHBOARD_LOG_DIR").ok().map(PathBuf::from);

        config
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the durable storage directory
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Set the backend time zone
    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.timezone = tz;
        self
    }

    /// Set the session lifetime
    pub fn with_session_expiry(mut self, expiry: Duration) -> Self {
        self.session_expiry = expiry;
        self
    }

    /// Set all poll intervals at once (tests and demos)
    pub fn with_poll_intervals(mut self, dashboard: Duration, users: Duration, status: Duration) -> Self {
        self.dashboard_poll = dashboard;
        self.users_poll = users;
        self.status_poll = status;
        self
    }

    /// Set the departments hidden from non-super roles
    pub fn with_restricted_departments<I, S>(mut self, departments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restricted_departments = departments.into_iter().map(Into::into).collect();
        self
    }

    /// Path of the durable session document
    pub fn session_file(&self) -> PathBuf {
        self.storage_dir.join("session.json")
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Poll interval from a millisecond setting; zero keeps `current`
fn poll_interval(key: &str, ms: Option<u64>, current: Duration) -> Duration {
    match ms {
        Some(0) => {
            tracing::warn!(key, "Poll interval must be positive, keeping default");
            current
        }
        Some(ms) => Duration::from_millis(ms),
        None => current,
    }
}
