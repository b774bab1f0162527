use std::collections::{HashMap, VecDeque};

use crate::scheduler::job::{Job, JobId, JobPayload, JobStatus};

/// Job table plus the FIFO of ids waiting for a device.
///
/// The FIFO may hold ids whose job has since left `Queued`; those are
/// discarded when they reach the head.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: HashMap<JobId, Job>,
    /// Submission order, for listing. Jobs are never removed.
    order: Vec<JobId>,
    pending: VecDeque<JobId>,
}

impl JobQueue {
    /// Store a new job and append its id to the tail of the FIFO.
    pub fn push(&mut self, payload: JobPayload) -> JobId {
        let job = Job::new(payload);
        let id = job.id;
        self.jobs.insert(id, job);
        self.order.push(id);
        self.pending.push_back(id);
        id
    }

    pub fn get_job(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn get_job_mut(&mut self, id: &JobId) -> Option<&mut Job> {
        self.jobs.get_mut(id)
    }

    /// Pop ids off the head until one still refers to a `Queued` job.
    pub fn pop_next_queued(&mut self) -> Option<JobId> {
        while let Some(id) = self.pending.pop_front() {
            match self.jobs.get(&id) {
                Some(job) if job.status == JobStatus::Queued => return Some(id),
                Some(job) => {
                    tracing::debug!(job_id = %id, status = %job.status, "Skipping stale queue entry");
                }
                None => {
                    tracing::debug!(job_id = %id, "Skipping queue entry for unknown job");
                }
            }
        }
        None
    }

    /// Ids currently in the FIFO, head first, stale entries included.
    pub fn pending_ids(&self) -> Vec<JobId> {
        self.pending.iter().copied().collect()
    }

    /// All jobs in submission order.
    pub fn all_jobs(&self) -> Vec<&Job> {
        self.order
            .iter()
            .filter_map(|id| self.jobs.get(id))
            .collect()
    }
}
