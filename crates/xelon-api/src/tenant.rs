//! Tenant lookup

use crate::client::{Client, NO_BODY};
use crate::error::{ApiError, Result};
use reqwest::Method;
use serde::Deserialize;

const TENANT_BASE_PATH: &str = "tenant";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Tenant {
    #[serde(rename = "tenant_identifier")]
    pub tenant_id: String,
}

pub struct Tenants<'a> {
    client: &'a Client,
}

impl<'a> Tenants<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Tenant of the authenticated user
    pub async fn get(&self) -> Result<Tenant> {
        let request = self.client.build_request(Method::GET, TENANT_BASE_PATH, NO_BODY)?;
        let tenant = self
            .client
            .execute::<Tenant>(request)
            .await?
            .unwrap_or_default();

        if tenant.tenant_id.is_empty() {
            return Err(ApiError::AuthenticationFailed(
                "tenant lookup returned no tenant identifier".to_string(),
            ));
        }
        Ok(tenant)
    }
}
