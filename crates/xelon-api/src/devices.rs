//! Device (virtual machine) operations

use crate::client::{Client, NO_BODY};
use crate::error::{ApiError, Result, require};
use crate::ssh::SshKey;
use reqwest::Method;
use serde::Deserialize;
use std::fmt;

const DEVICE_BASE_PATH: &str = "vmlist";

/// `provisioningState` value of a device that is allocated and active
pub const PROVISIONING_STATE_READY: i32 = 1;

/// Guest agent `runningStatus` reported once the guest tools are up
pub const GUEST_TOOLS_RUNNING: &str = "guestToolsRunning";

/// Device information returned by the device read endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceRoot {
    #[serde(rename = "toolsStatus")]
    pub tools_status: ToolsStatus,

    pub device: Device,
}

impl DeviceRoot {
    pub fn is_powered_on(&self) -> bool {
        self.device.power_state
    }

    /// Powered on and provisioned; guest agent status is not considered
    pub fn is_active(&self) -> bool {
        self.device.power_state && self.device.local_vm_details.state == PROVISIONING_STATE_READY
    }

    pub fn is_guest_agent_running(&self) -> bool {
        self.tools_status.running_status == GUEST_TOOLS_RUNNING
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Device {
    #[serde(rename = "cpu")]
    pub cpu_cores: u32,

    #[serde(rename = "localvmdetails")]
    pub local_vm_details: LocalVmDetails,

    pub networks: Vec<Network>,

    #[serde(rename = "powerstate")]
    pub power_state: bool,

    /// Memory in GB
    #[serde(rename = "ram")]
    pub memory_gb: u32,
}

impl Device {
    /// First assigned IP address
    pub fn ip_address(&self) -> Option<&str> {
        self.networks
            .iter()
            .map(|n| n.ip_address.as_str())
            .find(|ip| !ip.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolsStatus {
    #[serde(rename = "runningStatus")]
    pub running_status: String,

    pub version: String,

    #[serde(rename = "toolsStatus")]
    pub tools_status: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Network {
    #[serde(rename = "ip")]
    pub ip_address: String,

    pub label: String,

    #[serde(rename = "macAddress")]
    pub mac_address: String,
}

/// Short device information assigned by the control plane
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocalVmDetails {
    pub created_at: Option<String>,
    pub hv_system_id: i64,
    pub iso_mounted: Option<String>,

    #[serde(rename = "localvmid")]
    pub local_vm_id: String,

    pub ssh_keys: Vec<SshKey>,

    /// Provisioning state; [`PROVISIONING_STATE_READY`] when active
    pub state: i32,

    pub template_id: Option<i64>,
    pub updated_at: Option<String>,
    pub user_id: Option<i64>,

    #[serde(rename = "vmdisplayname")]
    pub display_name: String,

    #[serde(rename = "vmhostname")]
    pub hostname: String,
}

/// Response of the device create endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceCreateResponse {
    pub device: LocalVmDetails,

    /// Assigned addresses, primary first
    pub ips: Vec<String>,
}

impl DeviceCreateResponse {
    pub fn primary_ip(&self) -> Option<&str> {
        self.ips.first().map(String::as_str)
    }
}

/// Parameters for creating a device
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DeviceCreateConfiguration {
    pub cpu_cores: u32,
    /// Disk size in GB
    pub disk_size: u32,
    pub display_name: String,
    pub hostname: String,
    /// Orchestration (Kubernetes) id the device is attached to
    pub kubernetes_id: String,
    /// Memory in GB
    pub memory: u32,
    /// Root password of the device
    pub password: String,
    /// Swap disk size in GB
    pub swap_disk_size: u32,
    pub template_id: Option<u32>,
}

impl DeviceCreateConfiguration {
    fn validate(&self) -> Result<()> {
        if self.display_name.is_empty() && self.hostname.is_empty() && self.password.is_empty() {
            return Err(ApiError::EmptyPayload);
        }
        require("display_name", &self.display_name)?;
        require("hostname", &self.hostname)?;
        require("password", &self.password)?;
        Ok(())
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("cpucores", self.cpu_cores.to_string()),
            ("disksize", self.disk_size.to_string()),
            ("displayname", self.display_name.clone()),
            ("hostname", self.hostname.clone()),
            ("kubernetes_id", self.kubernetes_id.clone()),
            ("memory", self.memory.to_string()),
            ("password", self.password.clone()),
            ("swapdisksize", self.swap_disk_size.to_string()),
        ];
        if let Some(template_id) = self.template_id {
            pairs.push(("template_id", template_id.to_string()));
        }
        pairs
    }
}

impl fmt::Debug for DeviceCreateConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCreateConfiguration")
            .field("cpu_cores", &self.cpu_cores)
            .field("disk_size", &self.disk_size)
            .field("display_name", &self.display_name)
            .field("hostname", &self.hostname)
            .field("kubernetes_id", &self.kubernetes_id)
            .field("memory", &self.memory)
            .field("swap_disk_size", &self.swap_disk_size)
            .field("template_id", &self.template_id)
            .finish_non_exhaustive()
    }
}

/// Device operations of the Xelon API
pub struct Devices<'a> {
    client: &'a Client,
}

impl<'a> Devices<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Detailed information for a device identified by tenant and localvmid
    pub async fn get(&self, tenant_id: &str, local_vm_id: &str) -> Result<DeviceRoot> {
        require("tenant_id", tenant_id)?;
        require("local_vm_id", local_vm_id)?;

        let request = self.client.endpoint(
            Method::GET,
            &["device"],
            &[("tenant", tenant_id), ("localvmid", local_vm_id)],
            NO_BODY,
        )?;
        let device = self.client.execute::<DeviceRoot>(request).await?;
        Ok(device.unwrap_or_default())
    }

    /// Create a device. The control plane allocates its id and addresses.
    pub async fn create(&self, config: &DeviceCreateConfiguration) -> Result<DeviceCreateResponse> {
        config.validate()?;

        let pairs = config.query_pairs();
        let query: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let request = self.client.endpoint(
            Method::POST,
            &[DEVICE_BASE_PATH, "create"],
            &query,
            NO_BODY,
        )?;
        let response = self.client.execute::<DeviceCreateResponse>(request).await?;
        Ok(response.unwrap_or_default())
    }

    /// Delete a device. The account password is sent along when the client
    /// authenticates through the login exchange.
    pub async fn delete(&self, local_vm_id: &str) -> Result<()> {
        require("local_vm_id", local_vm_id)?;

        let query: Vec<(&str, &str)> = self
            .client
            .credentials()
            .password()
            .map(|password| vec![("password", password)])
            .unwrap_or_default();
        let request = self.client.endpoint(
            Method::DELETE,
            &[DEVICE_BASE_PATH, local_vm_id],
            &query,
            NO_BODY,
        )?;
        self.client.execute_empty(request).await?;
        Ok(())
    }

    /// Request power on. Success means the command was accepted.
    pub async fn start(&self, local_vm_id: &str) -> Result<()> {
        self.power_command(local_vm_id, "startserver").await
    }

    /// Request power off. Success means the command was accepted.
    pub async fn stop(&self, local_vm_id: &str) -> Result<()> {
        self.power_command(local_vm_id, "stopserver").await
    }

    async fn power_command(&self, local_vm_id: &str, command: &str) -> Result<()> {
        require("local_vm_id", local_vm_id)?;

        let request = self.client.endpoint(
            Method::POST,
            &[DEVICE_BASE_PATH, local_vm_id, command],
            &[],
            NO_BODY,
        )?;
        self.client.execute_empty(request).await?;
        Ok(())
    }
}
