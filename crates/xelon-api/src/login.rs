//! Login exchange

use crate::client::{Client, NO_BODY};
use crate::error::{Result, require};
use reqwest::Method;
use serde::Deserialize;

const LOGIN_BASE_PATH: &str = "login";

/// A Xelon user profile as returned by the login endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct User {
    pub api_token: String,

    #[serde(rename = "firstname")]
    pub first_name: String,

    pub id: i64,
    pub surname: String,

    #[serde(rename = "tenantIdentifier")]
    pub tenant_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserRoot {
    user: User,
}

pub struct Login<'a> {
    client: &'a Client,
}

impl<'a> Login<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Exchange account credentials for a user profile carrying an api token.
    ///
    /// The request is sent without an `Authorization` header.
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        require("username", username)?;
        require("password", password)?;

        let request = self.client.endpoint(
            Method::POST,
            &[LOGIN_BASE_PATH],
            &[("email", username), ("password", password)],
            NO_BODY,
        )?;
        let root = self
            .client
            .execute_unauthenticated::<UserRoot>(request)
            .await?
            .unwrap_or_default();
        Ok(root.user)
    }
}
