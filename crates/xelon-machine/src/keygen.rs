//! SSH key pair generation

use crate::error::{DriverError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Produces the key pair injected into a new device
#[async_trait]
pub trait KeyPairGenerator: Send + Sync {
    /// Ensure a key pair exists at `private_key` (public key at `<path>.pub`)
    /// and return the public key bytes
    async fn generate(&self, private_key: &Path) -> Result<Vec<u8>>;
}

/// Generates ed25519 keys with the system `ssh-keygen`
#[derive(Debug, Clone, Default)]
pub struct SshKeygen;

#[async_trait]
impl KeyPairGenerator for SshKeygen {
    async fn generate(&self, private_key: &Path) -> Result<Vec<u8>> {
        let public_key = public_key_path(private_key);

        let exists = tokio::fs::try_exists(private_key).await?
            && tokio::fs::try_exists(&public_key).await?;
        if exists {
            tracing::debug!("Reusing SSH key pair at {}", private_key.display());
            return Ok(tokio::fs::read(&public_key).await?);
        }

        if let Some(parent) = private_key.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::debug!("Running: ssh-keygen -t ed25519 -f {}", private_key.display());

        let output = Command::new("ssh-keygen")
            .args(["-t", "ed25519", "-q", "-N", ""])
            .arg("-f")
            .arg(private_key)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DriverError::KeyGeneration(format!("failed to run ssh-keygen: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DriverError::KeyGeneration(stderr.trim().to_string()));
        }

        Ok(tokio::fs::read(&public_key).await?)
    }
}

pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut path = private_key.as_os_str().to_owned();
    path.push(".pub");
    PathBuf::from(path)
}
