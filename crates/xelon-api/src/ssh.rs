//! SSH key operations

use crate::client::Client;
use crate::error::{ApiError, Result, require};
use reqwest::Method;
use serde::{Deserialize, Serialize};

const SSH_BASE_PATH: &str = "ssh";

/// An SSH key bound to a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SshKey {
    pub id: i64,
    pub name: String,

    #[serde(rename = "ssh_key")]
    pub public_key: String,

    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub deleted_at: Option<String>,
    pub user_id: Option<i64>,
    pub vm_id: Option<i64>,
}

/// Named public key to attach to a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SshKeyRequest {
    pub name: String,

    #[serde(rename = "ssh_key")]
    pub public_key: String,
}

impl SshKeyRequest {
    pub fn new(name: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public_key: public_key.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() && self.public_key.is_empty() {
            return Err(ApiError::EmptyPayload);
        }
        require("name", &self.name)?;
        require("public_key", &self.public_key)
    }
}

/// SSH key operations of the Xelon API
pub struct SshKeys<'a> {
    client: &'a Client,
}

impl<'a> SshKeys<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Attach a named public key to the device with the given localvmid
    pub async fn add(&self, local_vm_id: &str, key: &SshKeyRequest) -> Result<()> {
        require("local_vm_id", local_vm_id)?;
        key.validate()?;

        let request = self.client.endpoint(
            Method::POST,
            &["vmlist", local_vm_id, SSH_BASE_PATH, "add"],
            &[],
            Some(key),
        )?;
        self.client.execute_empty(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = SshKeyRequest::new("machine", "ssh-ed25519 AAAA machine");
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"name":"machine","ssh_key":"ssh-ed25519 AAAA machine"}"#
        );
    }

    #[test]
    fn test_request_validation() {
        assert!(matches!(
            SshKeyRequest::default().validate(),
            Err(ApiError::EmptyPayload)
        ));
        assert!(matches!(
            SshKeyRequest::new("", "ssh-ed25519 AAAA").validate(),
            Err(ApiError::EmptyArgument("name"))
        ));
        assert!(matches!(
            SshKeyRequest::new("machine", "").validate(),
            Err(ApiError::EmptyArgument("public_key"))
        ));
    }
}
