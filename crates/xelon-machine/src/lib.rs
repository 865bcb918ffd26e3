//! Xelon VDC machine driver
//!
//! Provisions and manages Docker hosts on Xelon VDC through the
//! [`MachineDriver`] contract. [`XelonDriver`] sequences the calls of
//! [`xelon_api`] into the create, stop, restart and remove flows; it owns no
//! persistent state beyond the [`DeviceHandle`] returned by `create`.
//!
//! ```ignore
//! use xelon_machine::{DriverConfig, MachineDriver, XelonDriver};
//!
//! let config = DriverConfig {
//!     token: Some(token),
//!     ..Default::default()
//! }
//! .with_machine_name("worker-1");
//! let mut driver = XelonDriver::new(config)?;
//! driver.pre_create_check()?;
//! let handle = driver.create().await?;
//! println!("{}", driver.get_url().await?);
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod jitter;
pub mod keygen;
pub mod xelon;

pub use config::{DriverConfig, PollConfig, Readiness};
pub use driver::{DeviceHandle, MachineDriver, MachineState};
pub use error::{DriverError, Result};
pub use jitter::{Jitter, NoJitter, RandomJitter};
pub use keygen::{KeyPairGenerator, SshKeygen, public_key_path};
pub use xelon::{DOCKER_PORT, DRIVER_NAME, XelonDriver};
