use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::scheduler::job::JobId;

/// Liveness state as reported by the device itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceState {
    #[default]
    Idle,
    Running,
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceState::Idle => write!(f, "IDLE"),
            DeviceState::Running => write!(f, "RUNNING"),
        }
    }
}

/// A polling worker, known only from its heartbeats.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: String,
    pub state: DeviceState,
    pub running_job: Option<JobId>,
    pub last_seen: Instant,
}

impl Device {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: DeviceState::default(),
            running_job: None,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self, state: DeviceState) {
        self.state = state;
        self.last_seen = Instant::now();
    }

    /// Informational only; nothing evicts a device for going quiet.
    pub fn seen_within(&self, window: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) < window
    }

    pub(crate) fn bind(&mut self, job_id: JobId) {
        self.running_job = Some(job_id);
        self.state = DeviceState::Running;
    }

    pub(crate) fn release(&mut self) {
        self.running_job = None;
        self.state = DeviceState::Idle;
    }
}
