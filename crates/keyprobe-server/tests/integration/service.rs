//! Service endpoints: health, info, announcement, static UI and 404s

use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;

use keyprobe_core::testing::ScriptedProber;
use keyprobe_core::ServerConfig;

use super::{get, TestApp};

fn app_with(config: ServerConfig) -> TestApp {
    TestApp::with_config(Arc::new(ScriptedProber::new()), config)
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::scripted(ScriptedProber::new());

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_service_info_counts() {
    let app = TestApp::scripted(ScriptedProber::new());

    let (_, body) = app.get("/api/info").await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["activeSessions"], 0);
    assert_eq!(body["stressJobs"], 0);

    let (_, accepted) = app.post("/verify", json!({ "credentials": ["a"] })).await;
    app.wait_for_completion(accepted["sessionId"].as_str().unwrap())
        .await;
    app.post("/stress/start", json!({ "credential": "kX" })).await;

    let (_, body) = app.get("/api/info").await;
    assert_eq!(body["activeSessions"], 1);
    assert_eq!(body["stressJobs"], 1);
    assert_eq!(body["runningStressJobs"], 1);
    assert!(body["uptimeSeconds"].is_number());
}

#[tokio::test]
async fn test_unknown_path_is_json_404() {
    let app = TestApp::scripted(ScriptedProber::new());

    let (status, body) = app.get("/no/such/page").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["path"], "/no/such/page");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_static_dir_serves_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>keyprobe</h1>").unwrap();

    let app = app_with(ServerConfig {
        static_dir: Some(dir.path().to_path_buf()),
        ..ServerConfig::default()
    });

    let (status, bytes) = app.send_raw(get("/index.html")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"<h1>keyprobe</h1>");

    // API routes still win over the static fallback
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = app.send_raw(get("/missing.css")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_announcement_present() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("announcement.txt");
    std::fs::write(&path, "  Maintenance tonight at 22:00\n").unwrap();

    let app = app_with(ServerConfig {
        announcement_file: path.clone(),
        ..ServerConfig::default()
    });

    let (status, body) = app.get("/announcement").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasAnnouncement"], true);
    assert_eq!(body["content"], "Maintenance tonight at 22:00");

    // Read on every request
    std::fs::write(&path, "Back to normal").unwrap();
    let (_, body) = app.get("/announcement").await;
    assert_eq!(body["content"], "Back to normal");
}

#[tokio::test]
async fn test_announcement_missing_or_blank() {
    let dir = tempfile::tempdir().unwrap();

    let app = app_with(ServerConfig {
        announcement_file: dir.path().join("absent.txt"),
        ..ServerConfig::default()
    });
    let (status, body) = app.get("/announcement").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "hasAnnouncement": false, "content": "" }));

    let blank = dir.path().join("blank.txt");
    std::fs::write(&blank, " \n\n").unwrap();
    let app = app_with(ServerConfig {
        announcement_file: blank,
        ..ServerConfig::default()
    });
    let (_, body) = app.get("/announcement").await;
    assert_eq!(body, json!({ "hasAnnouncement": false, "content": "" }));
}

#[tokio::test]
async fn test_announcement_read_failure() {
    let dir = tempfile::tempdir().unwrap();

    // A directory exists but cannot be read as text
    let app = app_with(ServerConfig {
        announcement_file: dir.path().to_path_buf(),
        ..ServerConfig::default()
    });
    let (status, body) = app.get("/announcement").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasAnnouncement"], false);
    assert_eq!(body["content"], "failed to read announcement");
}
