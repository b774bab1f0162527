pub mod assigner;
pub mod device;
pub mod dispatcher;
pub mod job;
pub mod queue;

pub use device::{Device, DeviceState};
pub use dispatcher::{Completion, Dispatcher, RegistrySnapshot};
pub use job::{
    BacklinkJob, CompletionReport, GenericJob, Job, JobId, JobOutcome, JobPayload, JobStatus,
    ResultItem,
};
pub use queue::JobQueue;
