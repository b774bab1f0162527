use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::{
    Device, DeviceState, Job, JobId, JobOutcome, JobPayload, JobStatus, ResultItem,
};

/// Envelope used for submissions and all error bodies.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub result: Option<T>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResult {
    pub job_id: JobId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub device_id: String,
    pub state: DeviceState,
    #[serde(default)]
    pub last_job_id: Option<String>,
}

/// What a device sees when it polls: a job id plus the submitted payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub job_id: JobId,
    #[serde(flatten)]
    pub payload: JobPayload,
}

impl From<Job> for JobDescriptor {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            payload: job.payload,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeartbeatResponse {
    None,
    Run { job: JobDescriptor },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultReport {
    pub job_id: String,
    pub status: JobOutcome,
    #[serde(default)]
    pub results: Vec<ResultItem>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub job_id: JobId,
    #[serde(flatten)]
    pub payload: JobPayload,
    pub status: JobStatus,
    pub assigned_device: Option<String>,
    pub results: Vec<ResultItem>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            payload: job.payload,
            status: job.status,
            assigned_device: job.assigned_device,
            results: job.results,
            error: job.error,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub device_id: String,
    pub state: DeviceState,
    pub running_job_id: Option<JobId>,
    pub last_seen_ms_ago: u64,
    pub stale: bool,
}

impl DeviceView {
    pub fn new(device: Device, taken_at: Instant, stale_after: Duration) -> Self {
        let silent_for = taken_at.saturating_duration_since(device.last_seen);
        Self {
            stale: !device.seen_within(stale_after, taken_at),
            last_seen_ms_ago: u64::try_from(silent_for.as_millis()).unwrap_or(u64::MAX),
            device_id: device.id,
            state: device.state,
            running_job_id: device.running_job,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueueStatus {
    pub queue: Vec<JobId>,
    pub jobs: Vec<JobView>,
    pub devices: Vec<DeviceView>,
}
