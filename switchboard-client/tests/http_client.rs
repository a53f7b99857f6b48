// switchboard-client/tests/http_client.rs
// Transport behaviour against an in-process server

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Json;
use serde_json::{Value, json};
use switchboard_client::{ApiRequest, ClientConfig, ClientError, HttpClient, NetworkHttpClient};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn echo_auth(headers: HeaderMap) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({"status": "success", "data": {"authorization": auth}}))
}

async fn html_page() -> impl IntoResponse {
    Html("<html><body>Fatal error</body></html>")
}

async fn server_error() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"status": "error", "message": "Database unavailable"})),
    )
}

async fn plain_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "no such route")
}

async fn client() -> NetworkHttpClient {
    let app = Router::new()
        .route("/api/echo/", get(echo_auth))
        .route("/api/html/", get(html_page))
        .route("/api/broken/", get(server_error))
        .route("/api/missing/", get(plain_not_found));
    let base = serve(app).await;
    NetworkHttpClient::new(&ClientConfig::new(format!("{base}/api/")).with_timeout(5)).unwrap()
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let http = client().await;

    let body = http
        .send(ApiRequest::get("echo/").with_token(Some("abc123".into())))
        .await
        .unwrap();
    assert_eq!(body["data"]["authorization"], json!("Bearer abc123"));

    let body = http.send(ApiRequest::get("/echo/")).await.unwrap();
    assert_eq!(body["data"]["authorization"], json!(""));
}

#[tokio::test]
async fn test_non_json_body_rejected() {
    let http = client().await;
    let err = http.send(ApiRequest::get("html/")).await.unwrap_err();
    let ClientError::NotJson { content_type } = &err else {
        panic!("expected NotJson, got {err:?}");
    };
    assert!(content_type.starts_with("text/html"));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_error_status_uses_json_message() {
    let http = client().await;
    let err = http.send(ApiRequest::get("broken/")).await.unwrap_err();
    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Database unavailable");
        }
        other => panic!("expected Status, got {other:?}"),
    }

    let err = http.send(ApiRequest::get("missing/")).await.unwrap_err();
    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no such route");
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let http = NetworkHttpClient::new(&ClientConfig::new(format!("http://{addr}")).with_timeout(2)).unwrap();
    let err = http.send(ApiRequest::get("status/")).await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));
    assert_eq!(err.user_message("Failed to fetch statuses"), "Failed to fetch statuses");
}
