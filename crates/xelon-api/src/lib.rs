//! Xelon VDC API client
//!
//! Typed access to the Xelon control plane used to provision virtual
//! machines ("devices").
//!
//! # Layers
//!
//! - [`Client`]: builds JSON requests against a base URL, injects the bearer
//!   credential, maps non-2xx responses to [`ApiError::Api`] and redacts the
//!   `password` query parameter from every URL it reports.
//! - [`Credentials`]: a static API token, or a username/password pair that is
//!   exchanged at the login endpoint for a token on every request.
//! - Resource operations ([`Devices`], [`SshKeys`], [`Tenants`], [`Login`]):
//!   each validates its arguments before any request is built.
//!
//! # Example
//!
//! ```ignore
//! use xelon_api::{Client, ClientConfig, Credentials};
//!
//! let client = Client::new(ClientConfig::new(Credentials::token("api-token")))?;
//! let tenant = client.tenant().get().await?;
//! let device = client.devices().get(&tenant.tenant_id, "localvmid").await?;
//! println!("powered on: {}", device.is_powered_on());
//! ```

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod login;
pub mod redact;
pub mod ssh;
pub mod tenant;

pub use auth::Credentials;
pub use client::{Client, ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, NO_BODY};
pub use devices::{
    Device, DeviceCreateConfiguration, DeviceCreateResponse, DeviceRoot, Devices,
    GUEST_TOOLS_RUNNING, LocalVmDetails, Network, PROVISIONING_STATE_READY, ToolsStatus,
};
pub use error::{ApiError, ErrorEnvelope, ErrorResponse, Result};
pub use login::{Login, User};
pub use redact::{REDACTED, redact_url};
pub use ssh::{SshKey, SshKeyRequest, SshKeys};
pub use tenant::{Tenant, Tenants};
pub use tokio_util::sync::CancellationToken;
