use std::collections::HashMap;

use crate::scheduler::device::{Device, DeviceState};
use crate::scheduler::job::JobId;

/// Device records keyed by the id each device reports for itself.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, Device>,
}

impl DeviceRegistry {
    /// Record a heartbeat, registering the device on first sight.
    pub fn heartbeat(&mut self, device_id: &str, state: DeviceState) -> &mut Device {
        let device = self
            .devices
            .entry(device_id.to_string())
            .or_insert_with(|| {
                tracing::info!(device_id, "Device registered");
                Device::new(device_id)
            });
        device.touch(state);
        device
    }

    pub fn get(&self, device_id: &str) -> Option<&Device> {
        self.devices.get(device_id)
    }

    /// The job this device currently holds, if any.
    pub fn running_job(&self, device_id: &str) -> Option<JobId> {
        self.devices.get(device_id).and_then(|d| d.running_job)
    }

    /// Give `job_id` to the device. The device must already be registered.
    pub fn bind(&mut self, device_id: &str, job_id: JobId) -> bool {
        match self.devices.get_mut(device_id) {
            Some(device) => {
                device.bind(job_id);
                true
            }
            None => false,
        }
    }

    /// Free the device if it still holds `job_id`. Returns whether it did.
    pub fn release(&mut self, device_id: &str, job_id: &JobId) -> bool {
        match self.devices.get_mut(device_id) {
            Some(device) if device.running_job.as_ref() == Some(job_id) => {
                device.release();
                true
            }
            _ => false,
        }
    }

    /// All devices ordered by id.
    pub fn all_devices(&self) -> Vec<&Device> {
        let mut devices: Vec<&Device> = self.devices.values().collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }
}
