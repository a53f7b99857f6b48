//! Push subscription registry
//!
//! Holds at most one push subscription in process memory and sends JSON
//! notifications to it. Nothing is persisted: a restart forgets the
//! subscription.
//!
//! Delivery goes through [`PushTransport`]. The registry hands over the
//! cleartext payload together with the subscription keys; a transport for a
//! real push service must encrypt the body (`aes128gcm`, RFC 8291) and sign
//! the request with its VAPID key before posting it to the endpoint. This
//! crate ships no such transport.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::{ClientError, ClientResult};

pub const DEFAULT_TITLE: &str = "Test Notification";
pub const DEFAULT_ICON: &str = "/icon.png";

/// Browser push subscription descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(default)]
    pub expiration_time: Option<i64>,
    pub keys: PushKeys,
}

/// Key material, base64 encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

impl PushSubscription {
    pub fn validate(&self) -> ClientResult<()> {
        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(ClientError::Push(format!("Invalid endpoint: {}", self.endpoint)));
        }
        decode_key(&self.keys.p256dh, "p256dh")?;
        decode_key(&self.keys.auth, "auth")?;
        Ok(())
    }
}

fn decode_key(value: &str, name: &str) -> ClientResult<Vec<u8>> {
    let trimmed = value.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD.decode(value))
        .map_err(|e| ClientError::Push(format!("Invalid {name} key: {e}")))?;
    if bytes.is_empty() {
        return Err(ClientError::Push(format!("Empty {name} key")));
    }
    Ok(bytes)
}

/// Notification body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl NotificationPayload {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            body: body.into(),
            icon: DEFAULT_ICON.to_string(),
        }
    }
}

/// Delivery seam
///
/// `payload` is the serialized [`NotificationPayload`] in clear; encryption
/// and VAPID signing belong to the implementation.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn deliver(&self, subscription: &PushSubscription, payload: &[u8]) -> ClientResult<()>;
}

/// Single in-memory subscription
pub struct PushRegistry {
    transport: Arc<dyn PushTransport>,
    subscription: Mutex<Option<PushSubscription>>,
}

impl PushRegistry {
    pub fn new(transport: Arc<dyn PushTransport>) -> Self {
        Self {
            transport,
            subscription: Mutex::new(None),
        }
    }

    /// Replace the held subscription
    pub fn subscribe(&self, subscription: PushSubscription) -> ClientResult<()> {
        subscription.validate()?;
        tracing::info!(endpoint = %subscription.endpoint, "Push subscription registered");
        *self.subscription.lock().unwrap_or_else(|e| e.into_inner()) = Some(subscription);
        Ok(())
    }

    pub fn unsubscribe(&self) {
        if self
            .subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .is_some()
        {
            tracing::info!("Push subscription removed");
        }
    }

    pub fn current(&self) -> Option<PushSubscription> {
        self.subscription.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Send `{ title, body, icon }` to the held subscription
    pub async fn send_notification(&self, message: &str) -> ClientResult<()> {
        let Some(subscription) = self.current() else {
            return Err(ClientError::Push("No subscription available".into()));
        };
        let payload = serde_json::to_vec(&NotificationPayload::new(message))?;
        self.transport
            .deliver(&subscription, &payload)
            .await
            .map_err(|e| {
                tracing::error!(endpoint = %subscription.endpoint, error = %e, "Error sending push notification");
                ClientError::Push("Failed to send notification".into())
            })
    }
}
