//! HTTP surface for submitters, devices and monitoring.
//!
//! Handlers only translate between JSON and [`Dispatcher`] calls; all state
//! lives in the dispatcher.

pub mod error;
pub mod types;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::scheduler::{
    BacklinkJob, Completion, CompletionReport, DeviceState, Dispatcher, JobId, JobPayload,
};

pub use error::{ApiError, ApiResult};
use types::{
    Ack, ApiResponse, DeviceView, HeartbeatRequest, HeartbeatResponse, JobView, QueueStatus,
    ResultReport, SubmitJobResult,
};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, config: ServerConfig) -> Self {
        Self {
            dispatcher,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/jobs", post(submit_job_handler))
        .route("/api/jobs/{job_id}", get(get_job_handler))
        .route("/api/backlink/job", post(submit_backlink_job_handler))
        .route("/api/backlink/queue/status", get(queue_status_handler))
        .route("/api/backlink/machine/heartbeat", post(heartbeat_handler))
        .route("/api/backlink/machine/result", post(report_result_handler))
        .layer(cors)
        .with_state(state)
}

/// Serve the API until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = config.listen_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Starting dispatch server");

    axum::serve(listener, router(AppState::new(dispatcher, config)))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Dispatch server stopped");
    Ok(())
}

async fn health_handler() -> &'static str {
    "ok"
}

fn submit(state: &AppState, payload: JobPayload) -> ApiResult<Json<ApiResponse<SubmitJobResult>>> {
    let errors = payload.validate();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let job_id = state.dispatcher.enqueue(payload);
    Ok(Json(ApiResponse {
        code: 200,
        message: "job queued".to_string(),
        result: Some(SubmitJobResult { job_id }),
    }))
}

async fn submit_job_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<JobPayload>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<SubmitJobResult>>> {
    let Json(payload) = payload?;
    submit(&state, payload)
}

async fn submit_backlink_job_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BacklinkJob>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<SubmitJobResult>>> {
    let Json(job) = payload?;
    submit(&state, job.into())
}

async fn get_job_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let job_id: JobId = job_id.parse().map_err(|_| ApiError::NotFound)?;
    let job = state.dispatcher.job(&job_id).ok_or(ApiError::NotFound)?;
    Ok(Json(job.into()))
}

async fn queue_status_handler(State(state): State<AppState>) -> Json<QueueStatus> {
    let snapshot = state.dispatcher.snapshot();
    let stale_after = state.config.device_stale_after();

    Json(QueueStatus {
        queue: snapshot.queue,
        jobs: snapshot.jobs.into_iter().map(JobView::from).collect(),
        devices: snapshot
            .devices
            .into_iter()
            .map(|device| DeviceView::new(device, snapshot.taken_at, stale_after))
            .collect(),
    })
}

async fn heartbeat_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<HeartbeatRequest>, JsonRejection>,
) -> ApiResult<Json<HeartbeatResponse>> {
    let Json(hb) = payload?;
    if hb.device_id.is_empty() {
        return Err(ApiError::Validation(vec![
            "deviceId must not be empty".to_string(),
        ]));
    }

    if let Some(last_job_id) = &hb.last_job_id {
        tracing::debug!(device_id = %hb.device_id, last_job_id = %last_job_id, "Device reported previous job");
    }

    // Only an idle device is asking for work; a busy one is just checking in.
    let response = match hb.state {
        DeviceState::Idle => match state.dispatcher.assign(&hb.device_id, hb.state) {
            Some(job) => HeartbeatResponse::Run { job: job.into() },
            None => HeartbeatResponse::None,
        },
        DeviceState::Running => {
            state.dispatcher.heartbeat(&hb.device_id, hb.state);
            HeartbeatResponse::None
        }
    };

    Ok(Json(response))
}

async fn report_result_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ResultReport>, JsonRejection>,
) -> ApiResult<Json<Ack>> {
    let Json(report) = payload?;

    let Ok(job_id) = report.job_id.parse::<JobId>() else {
        tracing::warn!(job_id = %report.job_id, "Result reported for malformed job id");
        return Err(ApiError::NotFound);
    };

    let completion = CompletionReport {
        job_id,
        outcome: report.status,
        results: report.results,
        error: report.error,
    };

    match state.dispatcher.complete(completion) {
        Ok(Completion::Recorded) => {}
        Ok(Completion::AlreadyTerminal) => {
            tracing::debug!(job_id = %job_id, "Duplicate result report acknowledged");
        }
        Err(e) => {
            tracing::warn!(job_id = %job_id, error = %e, "Result reported for unknown job");
            return Err(e.into());
        }
    }

    Ok(Json(Ack { ok: true }))
}
