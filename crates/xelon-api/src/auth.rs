//! Bearer credential strategies
//!
//! The transport client asks [`Credentials`] for a bearer token whenever an
//! outbound request has no `Authorization` header. A static token is used as
//! is; a username/password pair is exchanged at the login endpoint for a
//! fresh token on every such request (tokens are never cached).

use crate::client::Client;
use crate::error::{ApiError, Result};
use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Long-lived API token supplied by the caller
    Token(String),

    /// Account credentials exchanged for a short-lived token per request
    Login { username: String, password: String },
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Credentials::Token(token.into())
    }

    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Login {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Account password, when the exchange variant is active
    pub fn password(&self) -> Option<&str> {
        match self {
            Credentials::Token(_) => None,
            Credentials::Login { password, .. } => Some(password),
        }
    }

    /// Resolve a bearer token for exactly one outbound request.
    ///
    /// The login exchange goes through the client's unauthenticated path, so
    /// it never re-enters header injection.
    pub(crate) async fn bearer(&self, client: &Client) -> Result<String> {
        match self {
            Credentials::Token(token) => Ok(token.clone()),
            Credentials::Login { username, password } => {
                tracing::debug!("Exchanging account credentials for a bearer token");
                let user = client.login().login(username, password).await?;
                if user.api_token.is_empty() {
                    return Err(ApiError::AuthenticationFailed(
                        "login response did not contain an api token".to_string(),
                    ));
                }
                Ok(user.api_token)
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
            Credentials::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}
