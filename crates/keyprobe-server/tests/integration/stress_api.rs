//! Stress-test endpoints: `/stress/start`, `/stress/query`, `/stress/stop`

use axum::http::StatusCode;
use serde_json::json;
use std::time::Duration;

use keyprobe_core::testing::ScriptedProber;
use keyprobe_core::ProbeOutcome;

use super::TestApp;

#[tokio::test(start_paused = true)]
async fn test_start_query_stop() {
    let app = TestApp::scripted(ScriptedProber::new());

    let (status, body) = app
        .post("/stress/start", json!({ "credential": "sk-stress-0001", "model": "m" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
    let start_time = body["startTime"].as_i64().unwrap();

    let (status, body) = app
        .post("/stress/query", json!({ "credential": "sk-stress-0001" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);
    assert_eq!(body["status"], "running");
    assert_eq!(body["successCount"], 0);
    assert_eq!(body["totalCount"], 0);
    assert_eq!(body["elapsedMinutes"], 0);
    assert_eq!(body["remainingMinutes"], 120);
    assert_eq!(body["startTime"], start_time);
    assert_eq!(body["model"], "m");
    assert!(body.get("rating").is_none());
    assert!(body.get("ratingLabel").is_none());

    // Three ticks at 30s, 60s and 90s
    tokio::time::sleep(Duration::from_secs(95)).await;

    let (status, body) = app
        .post("/stress/stop", json!({ "credential": "sk-stress-0001" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["successCount"], 3);
    assert_eq!(body["totalCount"], 3);

    let (_, body) = app
        .post("/stress/query", json!({ "credential": "sk-stress-0001" }))
        .await;
    assert_eq!(body["status"], "stopped");
    assert_eq!(body["rating"], "oversold");
    assert_eq!(body["ratingLabel"], "definitely oversold");
}

#[tokio::test(start_paused = true)]
async fn test_second_start_conflicts() {
    let app = TestApp::scripted(ScriptedProber::new());

    let (status, _) = app.post("/stress/start", json!({ "apiKey": "kX" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/stress/start", json!({ "apiKey": "kX" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(app.state.stress.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_errors() {
    let app = TestApp::scripted(ScriptedProber::new());

    let (status, body) = app.post("/stress/stop", json!({ "credential": "kY" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    app.post("/stress/start", json!({ "credential": "kY" })).await;
    let (status, _) = app.post("/stress/stop", json!({ "credential": "kY" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/stress/stop", json!({ "credential": "kY" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATE");
}

#[tokio::test(start_paused = true)]
async fn test_query_unknown_credential() {
    let app = TestApp::scripted(ScriptedProber::new());

    let (status, body) = app.post("/stress/query", json!({ "credential": "nobody" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], false);
    assert!(body["message"].is_string());
    assert!(body.get("status").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_missing_credential_rejected() {
    let app = TestApp::scripted(ScriptedProber::new());

    for uri in ["/stress/start", "/stress/query", "/stress/stop"] {
        let (status, body) = app.post(uri, json!({ "model": "m" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["code"], "VALIDATION");

        let (status, _) = app.post(uri, json!({ "credential": "   " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }
    assert!(app.state.stress.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_full_run_is_rated() {
    let app = TestApp::scripted(
        ScriptedProber::new().always("weak", ProbeOutcome::failure(429, "rate limited")),
    );

    app.post("/stress/start", json!({ "credential": "strong" })).await;
    app.post("/stress/start", json!({ "credential": "weak" })).await;
    assert_eq!(app.state.stress.running(), 2);

    tokio::time::sleep(Duration::from_secs(2 * 60 * 60 + 5)).await;

    let (_, body) = app.post("/stress/query", json!({ "credential": "strong" })).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["successCount"], 240);
    assert_eq!(body["totalCount"], 240);
    assert_eq!(body["remainingMinutes"], 0);
    assert_eq!(body["rating"], "strong");
    assert_eq!(body["ratingLabel"], "strong");

    let (_, body) = app.post("/stress/query", json!({ "credential": "weak" })).await;
    assert_eq!(body["successCount"], 0);
    assert_eq!(body["ratingLabel"], "definitely oversold");
    assert_eq!(app.state.stress.running(), 0);

    // A finished job no longer blocks a restart
    let (status, _) = app.post("/stress/start", json!({ "credential": "strong" })).await;
    assert_eq!(status, StatusCode::OK);
}
