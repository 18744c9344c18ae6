//! HttpGateway against an in-process provider stub on a random port.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use fin_verify_core::config::ProviderConfig;
use fin_verify_core::{HttpGateway, VerificationGateway, VerifyError};
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "authorization": header("authorization"),
        "x_api_key": header("x-api-key"),
        "received": body,
    }))
}

async fn fail() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "provider maintenance window")
}

async fn plain_text() -> impl IntoResponse {
    (StatusCode::OK, "<html>not json</html>")
}

async fn accepted() -> impl IntoResponse {
    (StatusCode::ACCEPTED, Json(json!({"message": "queued"})))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"late": true}))
}

async fn spawn_provider() -> SocketAddr {
    let app = Router::new()
        .route("/v1/echo", post(echo))
        .route("/v1/fail", post(fail))
        .route("/v1/text", post(plain_text))
        .route("/v1/accepted", post(accepted))
        .route("/v1/slow", post(slow));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn gateway(addr: SocketAddr) -> HttpGateway {
    HttpGateway::new(ProviderConfig::new(format!("http://{addr}"), "key-123")).unwrap()
}

#[tokio::test]
async fn sends_bearer_credential_and_json_body() {
    let addr = spawn_provider().await;
    let out = gateway(addr)
        .call("/v1/echo", &json!({"otp": "123456"}))
        .await
        .unwrap();
    assert_eq!(out.status, 200);
    assert_eq!(out.body["authorization"], json!("Bearer key-123"));
    assert_eq!(out.body["received"], json!({"otp": "123456"}));
}

#[tokio::test]
async fn custom_header_sends_raw_key() {
    let addr = spawn_provider().await;
    let gw = HttpGateway::new(
        ProviderConfig::new(format!("http://{addr}"), "key-123").with_auth_header("X-Api-Key"),
    )
    .unwrap();
    let out = gw.call("/v1/echo", &json!({})).await.unwrap();
    assert_eq!(out.body["x_api_key"], json!("key-123"));
    assert_eq!(out.body["authorization"], Value::Null);
}

#[tokio::test]
async fn success_status_is_reported() {
    let addr = spawn_provider().await;
    let out = gateway(addr).call("/v1/accepted", &json!({})).await.unwrap();
    assert_eq!(out.status, 202);
    assert_eq!(out.body["message"], "queued");
}

#[tokio::test]
async fn non_success_status_is_upstream_error() {
    let addr = spawn_provider().await;
    let err = gateway(addr).call("/v1/fail", &json!({})).await.unwrap_err();
    match err {
        VerifyError::Upstream { status, body } => {
            assert_eq!(status, 503);
            assert!(body.contains("maintenance"));
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_success_is_upstream_error() {
    let addr = spawn_provider().await;
    let err = gateway(addr).call("/v1/text", &json!({})).await.unwrap_err();
    assert!(matches!(err, VerifyError::Upstream { status: 200, .. }));
    assert_eq!(err.public_message(), "upstream verification failed");
}

#[tokio::test]
async fn timeout_is_transport_error() {
    let addr = spawn_provider().await;
    let gw = HttpGateway::new(
        ProviderConfig::new(format!("http://{addr}"), "k").with_timeout(Duration::from_millis(200)),
    )
    .unwrap();
    let err = gw.call("/v1/slow", &json!({})).await.unwrap_err();
    assert!(matches!(err, VerifyError::Transport(_)), "{err:?}");
    assert_eq!(err.http_status(), 502);
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = gateway(addr).call("/v1/echo", &json!({})).await.unwrap_err();
    assert!(matches!(err, VerifyError::Transport(_)), "{err:?}");
}
