//! HTTP transport
//!
//! [`HttpClient`] is the object-safe seam between the typed API layer and the
//! network. [`NetworkHttpClient`] is the reqwest implementation; tests swap in
//! scripted fakes.

use async_trait::async_trait;
use http::Method;
use reqwest::Client;
use serde_json::Value;

use crate::{ClientConfig, ClientError, ClientResult};

/// One API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, query string included (`users/?userid=4`)
    pub path: String,
    pub body: Option<Value>,
    /// Bearer token
    pub token: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            token: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body,
            token: None,
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            body: Some(body),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

/// HTTP 客户端 trait
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a request and return the decoded JSON body
    async fn send(&self, request: ApiRequest) -> ClientResult<Value>;
}

/// 网络 HTTP 客户端
#[derive(Debug, Clone)]
pub struct NetworkHttpClient {
    client: Client,
    base_url: String,
}

impl NetworkHttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 获取基础 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn handle_response(response: reqwest::Response) -> ClientResult<Value> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let is_json = content_type.contains("application/json");

        if !status.is_success() {
            let text = response.text().await?;
            // 尝试解析为 API 错误响应
            let message = is_json
                .then(|| serde_json::from_str::<Value>(&text).ok())
                .flatten()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if !is_json {
            let raw = response.text().await.unwrap_or_default();
            tracing::error!(
                content_type = %content_type,
                body_len = raw.len(),
                "Unexpected response (not JSON)"
            );
            return Err(ClientError::NotJson { content_type });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl HttpClient for NetworkHttpClient {
    async fn send(&self, request: ApiRequest) -> ClientResult<Value> {
        let url = self.url(&request.path);
        let mut req = self.client.request(request.method.clone(), &url);
        if let Some(body) = &request.body {
            req = req.json(body);
        }
        if let Some(token) = &request.token {
            req = req.bearer_auth(token);
        }
        tracing::debug!(method = %request.method, path = %request.path, "API request");
        let response = req.send().await?;
        Self::handle_response(response).await
    }
}
