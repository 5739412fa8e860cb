//! `HttpProber` against a local OpenAI-style upstream

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use keyprobe_core::probe::NO_RESPONSE;
use keyprobe_core::{Credential, HttpProber, ProbeConfig, ProbeTarget, Prober, ServerConfig};

use super::TestApp;

const MODEL: &str = "probe-model";

async fn completions(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if body["model"] != MODEL || body["max_tokens"] != 10 || body["messages"][0]["role"] != "user" {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "unexpected request" }))).into_response();
    }

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    match token {
        "Bearer good" => Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "OK" } }]
        }))
        .into_response(),
        "Bearer slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "choices": [] })).into_response()
        }
        "Bearer plain" => (StatusCode::FORBIDDEN, "nope").into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "message": "Incorrect API key provided" } })),
        )
            .into_response(),
    }
}

/// Serve the fake upstream on an ephemeral port, returning its base URL
async fn spawn_upstream() -> String {
    let app = Router::new().route("/v1/chat/completions", post(completions));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn prober(timeout: Duration) -> HttpProber {
    HttpProber::new(ProbeConfig {
        timeout,
        ..ProbeConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_probe_outcomes() {
    let endpoint = spawn_upstream().await;
    let target = ProbeTarget::new(endpoint.as_str(), MODEL);
    let prober = prober(Duration::from_secs(5));

    let outcome = prober.probe(&Credential::new("good"), &target).await;
    assert!(outcome.succeeded);
    assert_eq!(outcome.status_code, 200);

    let outcome = prober.probe(&Credential::new("bad"), &target).await;
    assert!(!outcome.succeeded);
    assert_eq!(outcome.status_code, 401);
    assert_eq!(outcome.message, "Incorrect API key provided");

    let outcome = prober.probe(&Credential::new("plain"), &target).await;
    assert_eq!(outcome.status_code, 403);
    assert_eq!(outcome.message, "Forbidden");

    // Trailing slash on the endpoint is tolerated
    let target = ProbeTarget::new(format!("{}/", endpoint), MODEL);
    assert!(prober.probe(&Credential::new("good"), &target).await.succeeded);
}

#[tokio::test]
async fn test_probe_timeout() {
    let endpoint = spawn_upstream().await;
    let target = ProbeTarget::new(endpoint.as_str(), MODEL);

    let outcome = prober(Duration::from_millis(200))
        .probe(&Credential::new("slow"), &target)
        .await;
    assert!(!outcome.succeeded);
    assert_eq!(outcome.status_code, NO_RESPONSE);
    assert!(outcome.message.starts_with("request timed out"), "{}", outcome.message);
}

#[tokio::test]
async fn test_verify_end_to_end() {
    let endpoint = spawn_upstream().await;
    let app = TestApp::new(Arc::new(prober(Duration::from_secs(5))));

    let (status, body) = app
        .post(
            "/verify",
            json!({
                "credentials": ["good", "bad", "plain"],
                "endpoint": endpoint,
                "model": MODEL,
                "retries": 0
            }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let progress = app
        .wait_for_completion(body["sessionId"].as_str().unwrap())
        .await;
    assert_eq!(progress["finalResult"]["valid"], json!(["good"]));
    assert_eq!(
        progress["finalResult"]["invalid"],
        json!({ "401": ["bad"], "403": ["plain"] })
    );
}

#[tokio::test]
async fn test_verify_uses_configured_defaults() {
    let endpoint = spawn_upstream().await;
    let config = ServerConfig {
        default_endpoint: endpoint,
        default_model: MODEL.to_string(),
        ..ServerConfig::default()
    };
    let app = TestApp::with_config(Arc::new(prober(Duration::from_secs(5))), config);

    let (_, body) = app
        .post("/verify", json!({ "credentials": ["good"], "retries": 0 }))
        .await;
    let progress = app
        .wait_for_completion(body["sessionId"].as_str().unwrap())
        .await;
    assert_eq!(progress["finalResult"]["valid"], json!(["good"]));
}
