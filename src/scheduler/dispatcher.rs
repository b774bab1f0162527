//! The registry that hands queued jobs to polling devices.
//!
//! Every operation takes the one registry lock for its whole duration, so the
//! cross-entity invariants hold at every instant another caller can observe:
//!
//! - a device holds at most one job, and that job is `Running`;
//! - a `Running` job is held by exactly one device;
//! - terminal jobs never change again.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::error::{DispatchError, Result};
use crate::scheduler::assigner::DeviceRegistry;
use crate::scheduler::device::{Device, DeviceState};
use crate::scheduler::job::{CompletionReport, Job, JobId, JobPayload, JobStatus};
use crate::scheduler::queue::JobQueue;

/// Outcome of a successful completion report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The report was stored and the device released.
    Recorded,
    /// The job was already terminal; nothing changed.
    AlreadyTerminal,
}

/// Point-in-time copy of the whole registry.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub queue: Vec<JobId>,
    pub jobs: Vec<Job>,
    pub devices: Vec<Device>,
    pub taken_at: Instant,
}

#[derive(Debug, Default)]
struct Registry {
    queue: JobQueue,
    devices: DeviceRegistry,
}

impl Registry {
    fn assign(&mut self, device_id: &str, state: DeviceState) -> Option<Job> {
        self.devices.heartbeat(device_id, state);

        if let Some(job_id) = self.devices.running_job(device_id) {
            match self.queue.get_job(&job_id) {
                Some(job) if job.status == JobStatus::Running => {
                    tracing::debug!(job_id = %job_id, device_id, "Re-confirming running job");
                    return Some(job.clone());
                }
                _ => {
                    tracing::warn!(job_id = %job_id, device_id, "Device held a job that is no longer running");
                    self.devices.release(device_id, &job_id);
                }
            }
        }

        let job_id = self.queue.pop_next_queued()?;
        let job = self.queue.get_job_mut(&job_id)?;
        job.mark_running(device_id);
        self.devices.bind(device_id, job_id);

        tracing::info!(job_id = %job_id, device_id, "Job assigned");
        Some(job.clone())
    }

    fn complete(&mut self, report: CompletionReport) -> Result<Completion> {
        let job = self
            .queue
            .get_job_mut(&report.job_id)
            .ok_or(DispatchError::JobNotFound(report.job_id))?;

        if job.is_terminal() {
            tracing::debug!(job_id = %job.id, status = %job.status, "Ignoring duplicate completion report");
            return Ok(Completion::AlreadyTerminal);
        }

        job.record_completion(report.outcome, report.results, report.error);

        let released = match &job.assigned_device {
            Some(device_id) => self.devices.release(device_id, &job.id),
            None => false,
        };

        tracing::info!(
            job_id = %job.id,
            status = %job.status,
            device_id = ?job.assigned_device,
            released,
            "Job completed"
        );
        Ok(Completion::Recorded)
    }
}

/// Shared job/device registry.
///
/// Construct one per process and share it behind an `Arc`. All methods are
/// synchronous and never block on anything but the registry lock.
#[derive(Debug, Default)]
pub struct Dispatcher {
    registry: Mutex<Registry>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections never panic half-way, so a poisoned lock still guards
    // consistent state.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a `Queued` job and append it to the FIFO.
    pub fn enqueue(&self, payload: JobPayload) -> JobId {
        let job_id = self.lock().queue.push(payload);
        tracing::info!(job_id = %job_id, "Job enqueued");
        job_id
    }

    /// State-only heartbeat. Registers unknown devices; never touches jobs.
    pub fn heartbeat(&self, device_id: &str, state: DeviceState) {
        self.lock().devices.heartbeat(device_id, state);
        tracing::debug!(device_id, state = %state, "Heartbeat");
    }

    /// Heartbeat that also asks for work.
    ///
    /// Returns the job the device already holds if it is still running,
    /// otherwise the oldest queued job, otherwise `None`.
    pub fn assign(&self, device_id: &str, state: DeviceState) -> Option<Job> {
        self.lock().assign(device_id, state)
    }

    /// Record a terminal result for a job.
    ///
    /// Reports for jobs that are already terminal are accepted and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::JobNotFound`] if no job has this id.
    pub fn complete(&self, report: CompletionReport) -> Result<Completion> {
        self.lock().complete(report)
    }

    pub fn job(&self, job_id: &JobId) -> Option<Job> {
        self.lock().queue.get_job(job_id).cloned()
    }

    pub fn device(&self, device_id: &str) -> Option<Device> {
        self.lock().devices.get(device_id).cloned()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let registry = self.lock();
        RegistrySnapshot {
            queue: registry.queue.pending_ids(),
            jobs: registry.queue.all_jobs().into_iter().cloned().collect(),
            devices: registry.devices.all_devices().into_iter().cloned().collect(),
            taken_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::job::{BacklinkJob, JobOutcome};
    use serde_json::json;

    fn backlink(keyword: &str) -> JobPayload {
        JobPayload::Backlink(BacklinkJob {
            keyword: keyword.to_string(),
            backlink_url: "https://example.com".to_string(),
            number: 5,
        })
    }

    #[test]
    fn assign_marks_job_and_device() {
        let dispatcher = Dispatcher::new();
        let job_id = dispatcher.enqueue(backlink("x"));

        let job = dispatcher.assign("dev-1", DeviceState::Idle).unwrap();
        assert_eq!(job.id, job_id);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.assigned_device.as_deref(), Some("dev-1"));

        let device = dispatcher.device("dev-1").unwrap();
        assert_eq!(device.running_job, Some(job_id));
        assert_eq!(device.state, DeviceState::Running);
        assert!(dispatcher.snapshot().queue.is_empty());
    }

    #[test]
    fn assign_with_empty_queue_registers_device() {
        let dispatcher = Dispatcher::new();
        assert!(dispatcher.assign("dev-1", DeviceState::Idle).is_none());

        let device = dispatcher.device("dev-1").unwrap();
        assert_eq!(device.state, DeviceState::Idle);
        assert!(device.running_job.is_none());
    }

    #[test]
    fn heartbeat_does_not_assign() {
        let dispatcher = Dispatcher::new();
        let job_id = dispatcher.enqueue(backlink("x"));

        dispatcher.heartbeat("dev-1", DeviceState::Idle);
        assert_eq!(dispatcher.job(&job_id).unwrap().status, JobStatus::Queued);
        assert_eq!(dispatcher.snapshot().queue, vec![job_id]);
    }

    #[test]
    fn complete_unknown_job() {
        let dispatcher = Dispatcher::new();
        let missing = JobId::generate();
        let err = dispatcher
            .complete(CompletionReport::success(missing, Vec::new()))
            .unwrap_err();
        assert!(matches!(err, DispatchError::JobNotFound(id) if id == missing));
    }

    #[test]
    fn complete_releases_device() {
        let dispatcher = Dispatcher::new();
        let job_id = dispatcher.enqueue(backlink("x"));
        dispatcher.assign("dev-1", DeviceState::Idle).unwrap();

        let outcome = dispatcher
            .complete(CompletionReport::success(
                job_id,
                vec![json!({"newBacklink": "https://a.example"})],
            ))
            .unwrap();
        assert_eq!(outcome, Completion::Recorded);

        let device = dispatcher.device("dev-1").unwrap();
        assert!(device.running_job.is_none());
        assert_eq!(device.state, DeviceState::Idle);

        let job = dispatcher.job(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Success);
        assert_eq!(job.results.len(), 1);
    }

    #[test]
    fn complete_queued_job_leaves_stale_entry() {
        let dispatcher = Dispatcher::new();
        let job_id = dispatcher.enqueue(backlink("x"));

        let report = CompletionReport {
            job_id,
            outcome: JobOutcome::Failed,
            results: Vec::new(),
            error: Some("cancelled upstream".to_string()),
        };
        assert_eq!(dispatcher.complete(report).unwrap(), Completion::Recorded);

        // Entry still sits in the FIFO until someone pops it
        assert_eq!(dispatcher.snapshot().queue, vec![job_id]);
        assert!(dispatcher.assign("dev-1", DeviceState::Idle).is_none());
        assert!(dispatcher.snapshot().queue.is_empty());
    }

    #[test]
    fn snapshot_is_consistent() {
        let dispatcher = Dispatcher::new();
        let a = dispatcher.enqueue(backlink("a"));
        let b = dispatcher.enqueue(backlink("b"));
        dispatcher.assign("dev-2", DeviceState::Idle);
        dispatcher.heartbeat("dev-1", DeviceState::Idle);

        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.queue, vec![b]);
        assert_eq!(snapshot.jobs.len(), 2);
        assert_eq!(snapshot.jobs[0].id, a);
        assert_eq!(snapshot.jobs[0].status, JobStatus::Running);
        assert_eq!(snapshot.jobs[1].status, JobStatus::Queued);

        let devices: Vec<&str> = snapshot.devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(devices, vec!["dev-1", "dev-2"]);
        assert_eq!(snapshot.devices[1].running_job, Some(a));
    }
}
