//! Driver configuration
//!
//! Options and defaults mirror the `XELON_*` flags of the host. Flag and
//! environment parsing belongs to the caller; [`DriverConfig`] only checks
//! that a credential is present and the device password is long enough.

use crate::error::{DriverError, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use xelon_api::{
    Client, ClientConfig, Credentials, DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
    DeviceCreateConfiguration, DeviceRoot,
};

pub const DEFAULT_CPU_CORES: u32 = 2;
pub const DEFAULT_DEVICE_PASSWORD: &str = "Xelon22";
pub const DEFAULT_DISK_SIZE: u32 = 20;
pub const DEFAULT_KUBERNETES_ID: &str = "kub1";
pub const DEFAULT_MEMORY: u32 = 2;
pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_SSH_USER: &str = "root";
pub const DEFAULT_SWAP_DISK_SIZE: u32 = 2;

const MIN_DEVICE_PASSWORD_LEN: usize = 6;

/// When a polled device counts as ready
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Readiness {
    /// Powered on, provisioned and the guest agent reports running
    #[default]
    GuestAgent,
    /// Powered on and provisioned; guest agent status is ignored
    Provisioned,
}

impl Readiness {
    pub fn is_ready(&self, device: &DeviceRoot) -> bool {
        match self {
            Readiness::GuestAgent => device.is_active() && device.is_guest_agent_running(),
            Readiness::Provisioned => device.is_active(),
        }
    }
}

/// Timing of the provisioning and stop polling loops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Failed polls tolerated while waiting for readiness
    pub max_failures: u32,

    /// Not-ready observations tolerated before provisioning is abandoned
    pub max_polls: u32,

    /// Delay between readiness polls
    pub interval: Duration,

    /// Delay after a failed readiness poll
    pub failure_delay: Duration,

    /// Grace period after readiness before the device is configured
    pub settle_delay: Duration,

    /// Delay between polls while waiting for power off
    pub stop_interval: Duration,

    /// Upper bound of the random delay before creation
    pub max_jitter: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            max_polls: 150,
            interval: Duration::from_secs(2),
            failure_delay: Duration::from_secs(5),
            settle_delay: Duration::from_secs(15),
            stop_interval: Duration::from_secs(1),
            max_jitter: Duration::from_secs(10),
        }
    }
}

impl PollConfig {
    /// Same bounds as the default, without any delays
    pub fn immediate() -> Self {
        Self {
            interval: Duration::ZERO,
            failure_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            stop_interval: Duration::ZERO,
            max_jitter: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct DriverConfig {
    /// Machine name; used as device display name, hostname and SSH key name
    pub machine_name: String,

    /// Directory holding per-machine files such as the SSH key pair
    pub store_path: PathBuf,

    pub api_base_url: String,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,

    pub cpu_cores: u32,
    pub device_password: String,
    /// Disk size in GB
    pub disk_size: u32,
    pub kubernetes_id: String,
    /// Memory in GB
    pub memory: u32,
    /// Swap disk size in GB
    pub swap_disk_size: u32,
    pub template_id: Option<u32>,

    pub ssh_port: u16,
    pub ssh_user: String,

    pub request_timeout: Duration,
    pub readiness: Readiness,
    pub poll: PollConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        let store_path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("xelon-machine");

        Self {
            machine_name: "default".to_string(),
            store_path,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            username: None,
            password: None,
            cpu_cores: DEFAULT_CPU_CORES,
            device_password: DEFAULT_DEVICE_PASSWORD.to_string(),
            disk_size: DEFAULT_DISK_SIZE,
            kubernetes_id: DEFAULT_KUBERNETES_ID.to_string(),
            memory: DEFAULT_MEMORY,
            swap_disk_size: DEFAULT_SWAP_DISK_SIZE,
            template_id: None,
            ssh_port: DEFAULT_SSH_PORT,
            ssh_user: DEFAULT_SSH_USER.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            readiness: Readiness::default(),
            poll: PollConfig::default(),
        }
    }
}

impl DriverConfig {
    pub fn with_machine_name(mut self, name: impl Into<String>) -> Self {
        self.machine_name = name.into();
        self
    }

    /// Select the credential strategy: a token wins over account credentials
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(Credentials::token(token));
        }

        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok(Credentials::login(username, password))
            }
            _ => Err(DriverError::InvalidConfig(
                "xelon driver requires either a token or a username and password".to_string(),
            )),
        }
    }

    /// Build an API client for this configuration
    pub fn client(&self) -> Result<Client> {
        let config = ClientConfig::new(self.credentials()?)
            .with_base_url(&self.api_base_url)
            .with_timeout(self.request_timeout);
        Ok(Client::new(config)?)
    }

    /// Checks run before any device is requested
    pub fn validate(&self) -> Result<()> {
        self.credentials()?;
        if self.machine_name.is_empty() {
            return Err(DriverError::InvalidConfig(
                "machine name cannot be empty".to_string(),
            ));
        }
        if self.device_password.len() < MIN_DEVICE_PASSWORD_LEN {
            return Err(DriverError::InvalidConfig(format!(
                "device password must be at least {MIN_DEVICE_PASSWORD_LEN} characters long"
            )));
        }
        Ok(())
    }

    pub fn create_configuration(&self) -> DeviceCreateConfiguration {
        DeviceCreateConfiguration {
            cpu_cores: self.cpu_cores,
            disk_size: self.disk_size,
            display_name: self.machine_name.clone(),
            hostname: self.machine_name.clone(),
            kubernetes_id: self.kubernetes_id.clone(),
            memory: self.memory,
            password: self.device_password.clone(),
            swap_disk_size: self.swap_disk_size,
            template_id: self.template_id,
        }
    }

    /// Private key location; the public key sits next to it with a `.pub` suffix
    pub fn ssh_key_path(&self) -> PathBuf {
        self.store_path
            .join("machines")
            .join(&self.machine_name)
            .join("id_ed25519")
    }
}

impl fmt::Debug for DriverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverConfig")
            .field("machine_name", &self.machine_name)
            .field("store_path", &self.store_path)
            .field("api_base_url", &self.api_base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("cpu_cores", &self.cpu_cores)
            .field("disk_size", &self.disk_size)
            .field("kubernetes_id", &self.kubernetes_id)
            .field("memory", &self.memory)
            .field("swap_disk_size", &self.swap_disk_size)
            .field("template_id", &self.template_id)
            .field("ssh_port", &self.ssh_port)
            .field("ssh_user", &self.ssh_user)
            .field("request_timeout", &self.request_timeout)
            .field("readiness", &self.readiness)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}
