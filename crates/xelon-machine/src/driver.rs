//! Host driver contract
//!
//! The host orchestrator drives every machine through [`MachineDriver`]. A
//! driver is stateless between invocations apart from the [`DeviceHandle`]
//! it hands back from `create`, which the caller persists.

use crate::config::Readiness;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use xelon_api::DeviceRoot;

#[async_trait]
pub trait MachineDriver: Send + Sync {
    /// Returns the driver name (e.g., "xelon")
    fn driver_name(&self) -> &str;

    /// Validate configuration before anything is created
    fn pre_create_check(&self) -> Result<()>;

    /// Provision a machine and bring it up; returns the identifiers to persist
    async fn create(&mut self) -> Result<DeviceHandle>;

    /// Start the machine unless it is already running
    async fn start(&self) -> Result<()>;

    /// Stop the machine and wait until it reports powered off
    async fn stop(&self) -> Result<()>;

    /// Stop the machine, then start it again
    async fn restart(&self) -> Result<()>;

    /// Issue a stop command without checking state or waiting
    async fn kill(&self) -> Result<()>;

    /// Stop and delete the machine. Deleting an absent machine succeeds.
    async fn remove(&self) -> Result<()>;

    /// Current machine state; an unknown machine is `NotFound`, any other
    /// failed lookup is an error
    async fn get_state(&self) -> Result<MachineState>;

    /// Docker endpoint of a running machine
    async fn get_url(&self) -> Result<String>;

    /// Host to reach the machine over SSH
    async fn get_ssh_hostname(&self) -> Result<String>;

    /// Port of the machine's SSH daemon
    fn get_ssh_port(&self) -> u16;

    /// User to log in as over SSH
    fn get_ssh_username(&self) -> &str;
}

/// Identifiers assigned by the control plane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHandle {
    /// Tenant the device belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// `localvmid` of the device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_vm_id: Option<String>,

    /// Primary IP address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Machine state as reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    /// Powered on and ready
    Running,
    /// Powered on, not yet ready
    Starting,
    /// Powered off
    Stopped,
    /// The control plane does not know the device
    NotFound,
}

impl MachineState {
    pub fn from_device(device: &DeviceRoot, readiness: Readiness) -> Self {
        if !device.is_powered_on() {
            MachineState::Stopped
        } else if readiness.is_ready(device) {
            MachineState::Running
        } else {
            MachineState::Starting
        }
    }
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineState::Running => write!(f, "running"),
            MachineState::Starting => write!(f, "starting"),
            MachineState::Stopped => write!(f, "stopped"),
            MachineState::NotFound => write!(f, "not found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xelon_api::{GUEST_TOOLS_RUNNING, PROVISIONING_STATE_READY};

    fn device(power_state: bool, state: i32, guest_tools: bool) -> DeviceRoot {
        let mut root = DeviceRoot::default();
        root.device.power_state = power_state;
        root.device.local_vm_details.state = state;
        if guest_tools {
            root.tools_status.running_status = GUEST_TOOLS_RUNNING.to_string();
        }
        root
    }

    #[test]
    fn test_state_from_device() {
        let ready = PROVISIONING_STATE_READY;

        assert_eq!(
            MachineState::from_device(&device(false, ready, true), Readiness::GuestAgent),
            MachineState::Stopped
        );
        assert_eq!(
            MachineState::from_device(&device(true, ready, true), Readiness::GuestAgent),
            MachineState::Running
        );
        assert_eq!(
            MachineState::from_device(&device(true, ready, false), Readiness::GuestAgent),
            MachineState::Starting
        );
        assert_eq!(
            MachineState::from_device(&device(true, ready, false), Readiness::Provisioned),
            MachineState::Running
        );
        assert_eq!(
            MachineState::from_device(&device(true, 0, true), Readiness::Provisioned),
            MachineState::Starting
        );
    }

    #[test]
    fn test_state_display() {
        let states = [
            MachineState::Running,
            MachineState::Starting,
            MachineState::Stopped,
            MachineState::NotFound,
        ];
        let text: Vec<String> = states.iter().map(ToString::to_string).collect();
        assert_eq!(text, ["running", "starting", "stopped", "not found"]);
    }

    #[test]
    fn test_handle_serialization_skips_missing_fields() {
        let handle = DeviceHandle {
            tenant_id: Some("t-1".to_string()),
            local_vm_id: Some("vm-1".to_string()),
            ip_address: None,
        };

        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, r#"{"tenant_id":"t-1","local_vm_id":"vm-1"}"#);
        assert_eq!(serde_json::from_str::<DeviceHandle>(&json).unwrap(), handle);
    }
}
