//! Session store
//!
//! Single source of truth for who is logged in. The session is mirrored into
//! durable storage under three keys (`token`, `sessionUser`, `loginTime`)
//! that are always written and cleared together. A session lives for a fixed
//! window measured from login; a one-shot timer logs out when it elapses.
//!
//! The store is cheap to clone and is handed explicitly to every view that
//! needs it.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shared::types::{Timestamp, UserId};
use shared::{Capabilities, Role, SessionUser};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::access::{Navigator, Route};
use crate::storage::KeyValueStore;
use crate::{ClientConfig, ClientResult};

/// Durable key: bearer token
pub const TOKEN_KEY: &str = "token";
/// Durable key: serialized [`SessionUser`]
pub const USER_KEY: &str = "sessionUser";
/// Durable key: login instant in epoch milliseconds
pub const LOGIN_TIME_KEY: &str = "loginTime";

const SESSION_KEYS: [&str; 3] = [TOKEN_KEY, USER_KEY, LOGIN_TIME_KEY];

// ============================================================================
// Clock
// ============================================================================

/// Wall clock in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Timestamp {
        shared::util::now_millis()
    }
}

/// Settable clock for tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Authenticated identity plus bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
    /// Login instant (epoch ms)
    pub login_time: Timestamp,
}

impl Session {
    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    pub fn display_name(&self) -> &str {
        &self.user.name
    }

    pub fn role(&self) -> Role {
        self.user.role()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.user.role().capabilities()
    }

    /// Department id
    pub fn department(&self) -> Option<&str> {
        self.user.department.as_deref()
    }
}

/// What consumers observe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Restore from durable storage has finished
    pub ready: bool,
    pub session: Option<Session>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

/// Result of reading the durable keys
enum Restored {
    Missing,
    Malformed,
    Found(Session),
}

// ============================================================================
// Store
// ============================================================================

struct Inner {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
    expiry: Duration,
    state: watch::Sender<SessionSnapshot>,
    epoch: AtomicU64,
    expiry_timer: Mutex<Option<CancellationToken>>,
}

/// Session store handle
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("snapshot", &*self.inner.state.borrow())
            .field("epoch", &self.epoch())
            .finish()
    }
}

impl SessionStore {
    /// Create a store that is not ready yet; call [`SessionStore::initialize`]
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        navigator: Arc<dyn Navigator>,
        expiry: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                storage,
                clock,
                navigator,
                expiry,
                state,
                epoch: AtomicU64::new(0),
                expiry_timer: Mutex::new(None),
            }),
        }
    }

    /// Store backed by the configured session file and the system clock
    pub fn from_config(config: &ClientConfig, navigator: Arc<dyn Navigator>) -> Self {
        Self::new(
            Arc::new(crate::storage::FileStore::new(config.session_file())),
            Arc::new(SystemClock),
            navigator,
            config.session_expiry,
        )
    }

    /// Restore the session from durable storage
    ///
    /// Missing keys leave the store logged out. An expired session is logged
    /// out immediately. Otherwise the session is restored and the expiry
    /// timer is armed for the remaining window. Marks the store ready in every
    /// case. Must run inside a tokio runtime.
    pub fn initialize(&self) -> SessionSnapshot {
        match self.read_durable() {
            Restored::Missing => {
                tracing::debug!("No stored session");
                self.publish(None);
            }
            Restored::Malformed => {
                tracing::warn!("Stored session is malformed, ignoring until next login");
                self.publish(None);
            }
            Restored::Found(session) => {
                let elapsed = self.elapsed_since(session.login_time);
                if elapsed >= self.inner.expiry {
                    tracing::info!(
                        user_id = session.user_id(),
                        elapsed_secs = elapsed.as_secs(),
                        "Stored session expired"
                    );
                    self.logout();
                } else {
                    let remaining = self.inner.expiry - elapsed;
                    tracing::info!(
                        user_id = session.user_id(),
                        remaining_secs = remaining.as_secs(),
                        "Session restored"
                    );
                    self.inner.epoch.fetch_add(1, Ordering::SeqCst);
                    self.publish(Some(session));
                    self.arm_expiry(remaining);
                }
            }
        }
        self.snapshot()
    }

    /// Start a session
    ///
    /// The three durable keys are written as one batch before the session
    /// becomes visible. Must run inside a tokio runtime.
    pub fn login(&self, token: impl Into<String>, user: SessionUser) -> ClientResult<Session> {
        let session = Session {
            token: token.into(),
            user,
            login_time: self.inner.clock.now_millis(),
        };

        self.inner.storage.set_all(&[
            (TOKEN_KEY, session.token.clone()),
            (USER_KEY, serde_json::to_string(&session.user)?),
            (LOGIN_TIME_KEY, session.login_time.to_string()),
        ])?;

        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.publish(Some(session.clone()));
        self.arm_expiry(self.inner.expiry);

        tracing::info!(user_id = session.user_id(), role = %session.role(), "Logged in");
        Ok(session)
    }

    /// End the session and go to the login screen
    ///
    /// Safe to call when already logged out.
    pub fn logout(&self) {
        self.disarm_expiry();

        if let Err(e) = self.inner.storage.remove_all(&SESSION_KEYS) {
            tracing::error!(error = %e, "Failed to clear stored session");
        }

        let had_session = self.inner.state.borrow().session.is_some();
        if had_session {
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            tracing::info!("Logged out");
        }
        self.publish(None);
        self.inner.navigator.navigate(Route::Login { unauthorized: false });
    }

    /// Cancel the expiry timer without logging out (process shutdown)
    pub fn shutdown(&self) {
        self.disarm_expiry();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.state.borrow().session.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().session.as_ref().map(|s| s.token.clone())
    }

    pub fn is_ready(&self) -> bool {
        self.inner.state.borrow().ready
    }

    /// Changes on every login and logout
    pub fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    // ========== Internals ==========

    fn publish(&self, session: Option<Session>) {
        self.inner.state.send_replace(SessionSnapshot {
            ready: true,
            session,
        });
    }

    fn elapsed_since(&self, login_time: Timestamp) -> Duration {
        let delta = self.inner.clock.now_millis().saturating_sub(login_time);
        Duration::from_millis(delta.max(0) as u64)
    }

    fn read_durable(&self) -> Restored {
        let storage = &self.inner.storage;
        let read = |key: &str| match storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = key, error = %e, "Failed to read stored session key");
                None
            }
        };

        let (Some(token), Some(user), Some(login_time)) =
            (read(TOKEN_KEY), read(USER_KEY), read(LOGIN_TIME_KEY))
        else {
            return Restored::Missing;
        };

        let user = match serde_json::from_str::<SessionUser>(&user) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "Stored sessionUser is not valid JSON");
                return Restored::Malformed;
            }
        };
        let Ok(login_time) = login_time.trim().parse::<Timestamp>() else {
            tracing::warn!(login_time = %login_time, "Stored loginTime is not a number");
            return Restored::Malformed;
        };
        if token.is_empty() {
            return Restored::Malformed;
        }

        Restored::Found(Session {
            token,
            user,
            login_time,
        })
    }

    fn arm_expiry(&self, after: Duration) {
        let token = CancellationToken::new();
        if let Some(previous) = self
            .inner
            .expiry_timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(token.clone())
        {
            previous.cancel();
        }

        let store = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(after) => {
                    tracing::info!("Session expired");
                    store.logout();
                }
                _ = token.cancelled() => {}
            }
        });
    }

    fn disarm_expiry(&self) {
        if let Some(token) = self
            .inner
            .expiry_timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            token.cancel();
        }
    }
}
