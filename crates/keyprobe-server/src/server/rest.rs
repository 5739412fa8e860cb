//! REST API endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{StatusCode, Uri},
    Json,
};
use keyprobe_core::{BatchParams, BatchResult, Credential, KeyprobeError, ProgressSession};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::ApiError;
use super::messages::{
    HealthResponse, ServiceInfo, StressQueryResponse, StressRequest, StressStartResponse,
    StressStopResponse, VerifyRequest,
};
use crate::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// Start a batch run; progress is polled through `/progress/:session_id`
pub async fn verify(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BatchResult>)> {
    let Json(request) = payload?;

    let params = BatchParams::from_request(request.concurrency, request.retries)?;
    let job = state
        .verifier
        .open_session(request.credentials.unwrap_or_default())?;
    let target = state.target(request.endpoint, request.model);
    let accepted = job.initial_result();

    info!(
        "Batch {} accepted: {} credentials, concurrency {}, retries {}",
        job.session_id(),
        job.total(),
        params.concurrency(),
        params.retries()
    );

    let verifier = state.verifier.clone();
    tokio::spawn(async move {
        verifier.run(job, &target, params).await;
    });

    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// Current progress of a batch run
pub async fn progress(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<ProgressSession>> {
    state
        .sessions
        .get(&session_id)
        .map(Json)
        .ok_or_else(|| KeyprobeError::not_found("session", session_id).into())
}

pub async fn stress_start(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StressRequest>, JsonRejection>,
) -> ApiResult<Json<StressStartResponse>> {
    let Json(request) = payload?;
    let credential = required(request.credential)?;
    let target = state.target(request.endpoint, request.model);

    let started = state.stress.start(credential, target)?;
    Ok(Json(StressStartResponse {
        message: "stress test started; query its status at any time".to_string(),
        start_time: started.start_time,
    }))
}

pub async fn stress_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StressRequest>, JsonRejection>,
) -> ApiResult<Json<StressQueryResponse>> {
    let Json(request) = payload?;
    let credential = required(request.credential)?;

    let response = match state.stress.query(&credential) {
        Some(snapshot) => snapshot.into(),
        None => {
            debug!("No stress job for {}", credential);
            StressQueryResponse::missing()
        }
    };
    Ok(Json(response))
}

pub async fn stress_stop(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StressRequest>, JsonRejection>,
) -> ApiResult<Json<StressStopResponse>> {
    let Json(request) = payload?;
    let credential = required(request.credential)?;

    let stopped = state.stress.stop(&credential)?;
    Ok(Json(StressStopResponse {
        message: "stress test stopped".to_string(),
        success_count: stopped.success_count,
        total_count: stopped.total_count,
    }))
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "keyprobe server is running",
    })
}

/// Service info endpoint
pub async fn service_info(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        version: env!("CARGO_PKG_VERSION"),
        active_sessions: state.sessions.len(),
        stress_jobs: state.stress.len(),
        running_stress_jobs: state.stress.running(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Fallback for unknown paths when no static UI is served
pub async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "not found", "path": uri.path() })),
    )
}

fn required(credential: Option<Credential>) -> Result<Credential, KeyprobeError> {
    credential
        .filter(|c| !c.is_blank())
        .ok_or_else(|| KeyprobeError::Validation("credential is required".to_string()))
}
