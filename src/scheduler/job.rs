use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque job identifier, minted by the dispatcher at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    /// `Success` and `Failed` are final; nothing moves a job out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "QUEUED"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Success => write!(f, "SUCCESS"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Terminal status carried by a result report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobOutcome {
    Success,
    Failed,
}

impl From<JobOutcome> for JobStatus {
    fn from(outcome: JobOutcome) -> Self {
        match outcome {
            JobOutcome::Success => JobStatus::Success,
            JobOutcome::Failed => JobStatus::Failed,
        }
    }
}

/// One item of a job's result list. The dispatcher stores these verbatim.
pub type ResultItem = serde_json::Value;

/// Work handed to a backlink machine: post `number` backlinks for `keyword`
/// pointing at `backlink_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklinkJob {
    pub keyword: String,
    pub backlink_url: String,
    pub number: i64,
}

/// Free-form work item: a kind label plus arbitrary JSON data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericJob {
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Job body as submitted. The registry stores and returns it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "jobType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPayload {
    Backlink(BacklinkJob),
    Generic(GenericJob),
}

impl JobPayload {
    /// Check the payload shape before it is submitted.
    ///
    /// Returns an empty `Vec` if valid; otherwise a list of human-readable errors.
    pub fn validate(&self) -> Vec<String> {
        match self {
            JobPayload::Backlink(job) => job.validate(),
            JobPayload::Generic(job) => job.validate(),
        }
    }
}

impl From<BacklinkJob> for JobPayload {
    fn from(job: BacklinkJob) -> Self {
        JobPayload::Backlink(job)
    }
}

impl From<GenericJob> for JobPayload {
    fn from(job: GenericJob) -> Self {
        JobPayload::Generic(job)
    }
}

impl BacklinkJob {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.keyword.trim().is_empty() {
            errors.push("keyword must not be empty".to_string());
        }

        if !is_http_url(&self.backlink_url) {
            errors.push(format!(
                "backlinkUrl must be an absolute http(s) URL, got {:?}",
                self.backlink_url
            ));
        }

        if !(1..=100).contains(&self.number) {
            errors.push(format!(
                "number must be between 1 and 100, got {}",
                self.number
            ));
        }

        errors
    }
}

impl GenericJob {
    pub fn validate(&self) -> Vec<String> {
        if self.kind.trim().is_empty() {
            vec!["kind must not be empty".to_string()]
        } else {
            Vec::new()
        }
    }
}

fn is_http_url(raw: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// A completion report as received from a device.
#[derive(Debug, Clone)]
pub struct CompletionReport {
    pub job_id: JobId,
    pub outcome: JobOutcome,
    pub results: Vec<ResultItem>,
    pub error: Option<String>,
}

impl CompletionReport {
    pub fn success(job_id: JobId, results: Vec<ResultItem>) -> Self {
        Self {
            job_id,
            outcome: JobOutcome::Success,
            results,
            error: None,
        }
    }

    pub fn failed(job_id: JobId, error: impl Into<String>) -> Self {
        Self {
            job_id,
            outcome: JobOutcome::Failed,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub payload: JobPayload,
    pub status: JobStatus,
    pub assigned_device: Option<String>,
    pub results: Vec<ResultItem>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(payload: JobPayload) -> Self {
        Self {
            id: JobId::generate(),
            payload,
            status: JobStatus::Queued,
            assigned_device: None,
            results: Vec::new(),
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub(crate) fn mark_running(&mut self, device_id: &str) {
        self.status = JobStatus::Running;
        self.assigned_device = Some(device_id.to_string());
    }

    /// Record the first terminal report. The error message is kept only for
    /// failed jobs.
    pub(crate) fn record_completion(
        &mut self,
        outcome: JobOutcome,
        results: Vec<ResultItem>,
        error: Option<String>,
    ) {
        self.status = outcome.into();
        self.results = results;
        self.error = match outcome {
            JobOutcome::Failed => error,
            JobOutcome::Success => None,
        };
        self.completed_at = Some(Utc::now());
    }
}
