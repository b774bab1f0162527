use thiserror::Error;

use crate::scheduler::JobId;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
