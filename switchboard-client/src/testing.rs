//! Scripted HTTP fake and session fixtures for unit tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use shared::{Role, SessionUser};

use crate::access::HistoryNavigator;
use crate::http::{ApiRequest, HttpClient};
use crate::session::{ManualClock, SessionStore};
use crate::storage::MemoryStore;
use crate::{ClientError, ClientResult};

#[derive(Clone)]
enum Reply {
    Json { delay: Duration, body: Value },
    Status(u16),
    NotJson,
}

/// Answers by request path; unknown paths get a 404
#[derive(Default)]
pub(crate) struct FakeHttp {
    routes: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, body: Value) {
        self.respond_after(path, Duration::ZERO, body);
    }

    pub fn respond_after(&self, path: &str, delay: Duration, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Reply::Json { delay, body });
    }

    pub fn fail(&self, path: &str, status: u16) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Reply::Status(status));
    }

    pub fn not_json(&self, path: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Reply::NotJson);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn send(&self, request: ApiRequest) -> ClientResult<Value> {
        let reply = self.routes.lock().unwrap().get(&request.path).cloned();
        self.requests.lock().unwrap().push(request);
        match reply {
            Some(Reply::Json { delay, body }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(body)
            }
            Some(Reply::Status(status)) => Err(ClientError::Status {
                status,
                message: "error".into(),
            }),
            Some(Reply::NotJson) => Err(ClientError::NotJson {
                content_type: "text/html".into(),
            }),
            None => Err(ClientError::Status {
                status: 404,
                message: "not found".into(),
            }),
        }
    }
}

pub(crate) const NOW: i64 = 1_750_000_000_000;

pub(crate) struct SessionFixture {
    pub storage: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub navigator: Arc<HistoryNavigator>,
    pub store: SessionStore,
}

/// Ready, logged-out store over memory storage
pub(crate) fn session_fixture() -> SessionFixture {
    let storage = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let navigator = Arc::new(HistoryNavigator::new());
    let store = SessionStore::new(
        storage.clone(),
        clock.clone(),
        navigator.clone(),
        Duration::from_secs(10 * 60 * 60),
    );
    store.initialize();
    SessionFixture {
        storage,
        clock,
        navigator,
        store,
    }
}

pub(crate) fn user(id: i64, role: Role, department: &str) -> SessionUser {
    SessionUser {
        id,
        name: format!("User {id}"),
        user_role: role,
        department: Some(department.to_string()),
    }
}

/// Logged-in store
pub(crate) fn logged_in(role: Role) -> SessionFixture {
    let fixture = session_fixture();
    fixture
        .store
        .login("token-1", user(1, role, "3"))
        .unwrap();
    fixture
}
