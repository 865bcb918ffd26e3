//! Machine driver error types

use crate::driver::MachineState;
use thiserror::Error;
use xelon_api::ApiError;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Device has not been created yet")]
    NotCreated,

    #[error("Device is not running (state: {0})")]
    NotRunning(MachineState),

    #[error("Device {id} did not become ready after {polls} polls")]
    ProvisioningTimeout { id: String, polls: u32 },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("SSH key generation failed: {0}")]
    KeyGeneration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl DriverError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DriverError::Api(e) if e.is_cancelled())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DriverError::Api(e) if e.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
