//! Xelon machine driver
//!
//! Drives a device through its lifecycle against the Xelon API:
//!
//! - create: resolve tenant, request the device, poll until ready, inject the
//!   SSH key, then start it unless it is already running
//! - stop: request power off if powered on, then poll until powered off
//! - remove: stop, then delete; a device the control plane no longer knows
//!   counts as removed
//!
//! A device that cannot be brought up is sent one stop command and deleted
//! again before the error is returned.

use crate::config::DriverConfig;
use crate::driver::{DeviceHandle, MachineDriver, MachineState};
use crate::error::{DriverError, Result};
use crate::jitter::{Jitter, RandomJitter};
use crate::keygen::{KeyPairGenerator, SshKeygen};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use xelon_api::{ApiError, CancellationToken, Client, DeviceRoot, SshKeyRequest};

pub const DRIVER_NAME: &str = "xelon";

/// Port of the Docker daemon on a provisioned machine
pub const DOCKER_PORT: u16 = 2376;

pub struct XelonDriver {
    config: DriverConfig,
    client: Client,
    handle: DeviceHandle,
    keygen: Arc<dyn KeyPairGenerator>,
    jitter: Arc<dyn Jitter>,
}

impl XelonDriver {
    pub fn new(config: DriverConfig) -> Result<Self> {
        let client = config.client()?;
        Ok(Self {
            config,
            client,
            handle: DeviceHandle::default(),
            keygen: Arc::new(SshKeygen),
            jitter: Arc::new(RandomJitter),
        })
    }

    /// Resume a previously created device
    pub fn with_handle(mut self, handle: DeviceHandle) -> Self {
        self.handle = handle;
        self
    }

    pub fn with_key_generator(mut self, keygen: Arc<dyn KeyPairGenerator>) -> Self {
        self.keygen = keygen;
        self
    }

    pub fn with_jitter(mut self, jitter: Arc<dyn Jitter>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Stop every call and delay as soon as `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.client = self.client.with_cancellation(token);
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    fn local_vm_id(&self) -> Result<String> {
        self.handle
            .local_vm_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(DriverError::NotCreated)
    }

    fn ip_address(&self) -> Result<String> {
        self.handle
            .ip_address
            .clone()
            .filter(|ip| !ip.is_empty())
            .ok_or(DriverError::NotCreated)
    }

    /// Tenant recorded at create time, or looked up for the current credentials
    async fn tenant_id(&self) -> Result<String> {
        match self.handle.tenant_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Ok(self.client.tenant().get().await?.tenant_id),
        }
    }

    async fn pause(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.client.cancellation_token().cancelled() => Err(ApiError::Cancelled.into()),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    async fn wait_until_ready(&self, tenant_id: &str, local_vm_id: &str) -> Result<DeviceRoot> {
        let poll = &self.config.poll;
        let mut failures = 0u32;
        let mut polls = 0u32;

        loop {
            match self.client.devices().get(tenant_id, local_vm_id).await {
                Ok(device) => {
                    tracing::debug!(
                        "device.powerstate: {}, device.state: {}, tools.runningStatus: {:?}",
                        device.device.power_state,
                        device.device.local_vm_details.state,
                        device.tools_status.running_status
                    );
                    if self.config.readiness.is_ready(&device) {
                        return Ok(device);
                    }

                    polls += 1;
                    if polls >= poll.max_polls {
                        return Err(DriverError::ProvisioningTimeout {
                            id: local_vm_id.to_string(),
                            polls,
                        });
                    }
                    self.pause(poll.interval).await?;
                }
                Err(e) if e.is_cancelled() => return Err(e.into()),
                Err(e) => {
                    failures += 1;
                    if failures > poll.max_failures {
                        return Err(e.into());
                    }
                    tracing::debug!(
                        "Error by getting device information: retry {} of {}: {}",
                        failures,
                        poll.max_failures,
                        e
                    );
                    self.pause(poll.failure_delay).await?;
                }
            }
        }
    }

    /// Best-effort cleanup of a device that could not be brought up.
    ///
    /// The stop command is sent once without waiting for power off; the
    /// delete always follows.
    async fn compensate(&self, local_vm_id: &str) {
        tracing::info!("Xelon device could not be created, cleaning up resources...");
        let devices = self.client.devices();

        match devices.stop(local_vm_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::warn!("Failed to stop device {}: {}", local_vm_id, e),
        }
        match devices.delete(local_vm_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::warn!("Failed to delete device {}: {}", local_vm_id, e),
        }
    }

    async fn add_ssh_key(&self, local_vm_id: &str) -> Result<()> {
        let public_key = self.keygen.generate(&self.config.ssh_key_path()).await?;
        let public_key = String::from_utf8_lossy(&public_key).trim().to_string();

        let request = SshKeyRequest::new(&self.config.machine_name, public_key);
        self.client.ssh_keys().add(local_vm_id, &request).await?;
        Ok(())
    }

    async fn start_device(&self, tenant_id: &str, local_vm_id: &str) -> Result<()> {
        let devices = self.client.devices();

        tracing::debug!("Checking device state...");
        let device = devices.get(tenant_id, local_vm_id).await?;
        if device.is_active() {
            tracing::debug!("Device is already running");
            return Ok(());
        }

        tracing::info!("Starting Xelon device...");
        devices.start(local_vm_id).await?;
        Ok(())
    }

    async fn stop_device(&self, tenant_id: &str, local_vm_id: &str) -> Result<()> {
        let devices = self.client.devices();

        tracing::debug!("Checking device state...");
        let device = devices.get(tenant_id, local_vm_id).await?;
        if !device.is_powered_on() {
            tracing::debug!("Device is already stopped");
            return Ok(());
        }

        tracing::info!("Stopping Xelon device...");
        devices.stop(local_vm_id).await?;

        tracing::debug!("Waiting until device is stopped...");
        loop {
            let device = devices.get(tenant_id, local_vm_id).await?;
            if !device.is_powered_on() {
                return Ok(());
            }
            self.pause(self.config.poll.stop_interval).await?;
        }
    }
}

#[async_trait]
impl MachineDriver for XelonDriver {
    fn driver_name(&self) -> &str {
        DRIVER_NAME
    }

    fn pre_create_check(&self) -> Result<()> {
        self.config.validate()
    }

    async fn create(&mut self) -> Result<DeviceHandle> {
        tracing::info!("Authenticating into Xelon VDC...");
        let tenant_id = self.client.tenant().get().await?.tenant_id;
        tracing::debug!("User tenant id: {}", tenant_id);
        self.handle.tenant_id = Some(tenant_id.clone());

        let delay = self.jitter.delay(self.config.poll.max_jitter);
        tracing::debug!("Random delay before creating the device: {:?}", delay);
        self.pause(delay).await?;

        tracing::info!("Creating Xelon device...");
        let create = self.config.create_configuration();
        tracing::debug!("Device configuration: {:?}", create);
        let response = self.client.devices().create(&create).await?;

        let local_vm_id = response.device.local_vm_id.clone();
        if local_vm_id.is_empty() {
            return Err(DriverError::UnexpectedResponse(
                "create response did not contain a device id".to_string(),
            ));
        }
        self.handle.local_vm_id = Some(local_vm_id.clone());
        self.handle.ip_address = response.primary_ip().map(str::to_string);

        tracing::info!("Waiting until Xelon device is provisioned...");
        let device = match self.wait_until_ready(&tenant_id, &local_vm_id).await {
            Ok(device) => device,
            Err(e) if e.is_cancelled() => {
                tracing::warn!(
                    "Provisioning cancelled, device {} was left behind",
                    local_vm_id
                );
                return Err(e);
            }
            Err(e) => {
                self.compensate(&local_vm_id).await;
                return Err(e);
            }
        };

        if self.handle.ip_address.is_none() {
            let Some(ip) = device.device.ip_address() else {
                self.compensate(&local_vm_id).await;
                return Err(DriverError::UnexpectedResponse(format!(
                    "device {local_vm_id} has no IP address"
                )));
            };
            self.handle.ip_address = Some(ip.to_string());
        }

        tracing::debug!(
            "Waiting {:?} for the device to settle",
            self.config.poll.settle_delay
        );
        self.pause(self.config.poll.settle_delay).await?;

        tracing::info!("Adding SSH key to the device...");
        self.add_ssh_key(&local_vm_id).await?;

        self.start_device(&tenant_id, &local_vm_id).await?;

        tracing::debug!(
            "Created device {} with IP address {:?}",
            local_vm_id,
            self.handle.ip_address
        );
        Ok(self.handle.clone())
    }

    async fn start(&self) -> Result<()> {
        let local_vm_id = self.local_vm_id()?;
        let tenant_id = self.tenant_id().await?;
        self.start_device(&tenant_id, &local_vm_id).await
    }

    async fn stop(&self) -> Result<()> {
        let local_vm_id = self.local_vm_id()?;
        let tenant_id = self.tenant_id().await?;
        self.stop_device(&tenant_id, &local_vm_id).await
    }

    async fn restart(&self) -> Result<()> {
        let local_vm_id = self.local_vm_id()?;
        let tenant_id = self.tenant_id().await?;
        self.stop_device(&tenant_id, &local_vm_id).await?;
        self.start_device(&tenant_id, &local_vm_id).await
    }

    async fn kill(&self) -> Result<()> {
        let local_vm_id = self.local_vm_id()?;
        self.client.devices().stop(&local_vm_id).await?;
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        let local_vm_id = self.local_vm_id()?;
        let tenant_id = self.tenant_id().await?;

        match self.stop_device(&tenant_id, &local_vm_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("Device {} not found while stopping", local_vm_id);
            }
            Err(e) => return Err(e),
        }

        tracing::info!("Deleting Xelon device...");
        match self.client.devices().delete(&local_vm_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::info!("Xelon device doesn't exist, assuming it is already deleted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_state(&self) -> Result<MachineState> {
        let local_vm_id = self.local_vm_id()?;
        let tenant_id = self.tenant_id().await?;

        match self.client.devices().get(&tenant_id, &local_vm_id).await {
            Ok(device) => Ok(MachineState::from_device(&device, self.config.readiness)),
            Err(e) if e.is_not_found() => Ok(MachineState::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_url(&self) -> Result<String> {
        let state = self.get_state().await?;
        if state != MachineState::Running {
            return Err(DriverError::NotRunning(state));
        }
        let ip = self.ip_address()?;
        Ok(format!("tcp://{}", join_host_port(&ip, DOCKER_PORT)))
    }

    async fn get_ssh_hostname(&self) -> Result<String> {
        self.ip_address()
    }

    fn get_ssh_port(&self) -> u16 {
        self.config.ssh_port
    }

    fn get_ssh_username(&self) -> &str {
        &self.config.ssh_user
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
