//! Xelon API error types

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Body of a non-2xx response: `{ "error": string, "code": number? }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: String,

    #[serde(default)]
    pub code: Option<i64>,
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.error, code),
            None => write!(f, "{}", self.error),
        }
    }
}

/// A non-2xx response returned by the Xelon API
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    /// HTTP method of the failed request
    pub method: Method,

    /// Request URL with the `password` parameter redacted
    pub url: String,

    /// HTTP status code of the response
    pub status: StatusCode,

    /// Decoded error body (empty when the body was empty)
    pub envelope: ErrorEnvelope,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} {}",
            self.method,
            self.url,
            self.status.as_u16(),
            self.envelope
        )
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("argument cannot be empty: {0}")]
    EmptyArgument(&'static str),

    #[error("empty payload is not allowed")]
    EmptyPayload,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("{method} {url}: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("{0}")]
    Api(ErrorResponse),

    #[error("failed to decode response of {method} {url}: {source}")]
    Decode {
        method: Method,
        url: String,
        /// Set when the undecodable body belonged to a non-2xx response
        status: Option<StatusCode>,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write response body: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status code of a non-2xx response, if this error came from one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Api(response) => Some(response.status),
            ApiError::Decode { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Whether the error was raised before any request was built
    pub fn is_argument_error(&self) -> bool {
        matches!(self, ApiError::EmptyArgument(_) | ApiError::EmptyPayload)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Fails with [`ApiError::EmptyArgument`] when `value` is empty
pub(crate) fn require(name: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ApiError::EmptyArgument(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_message_format() {
        let error = ApiError::Api(ErrorResponse {
            method: Method::POST,
            url: "https://vdc.xelon.ch/api/service/login?password=REDACTED".to_string(),
            status: StatusCode::UNAUTHORIZED,
            envelope: ErrorEnvelope {
                error: "Unauthenticated user".to_string(),
                code: Some(401),
            },
        });

        assert_eq!(
            error.to_string(),
            "POST https://vdc.xelon.ch/api/service/login?password=REDACTED: 401 Unauthenticated user (code 401)"
        );
        assert_eq!(error.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_envelope_without_code() {
        let envelope: ErrorEnvelope = serde_json::from_str(r#"{"error":"bad request"}"#).unwrap();
        assert_eq!(envelope.code, None);
        assert_eq!(envelope.to_string(), "bad request");
    }

    #[test]
    fn test_argument_errors() {
        assert!(ApiError::EmptyArgument("local_vm_id").is_argument_error());
        assert!(ApiError::EmptyPayload.is_argument_error());
        assert!(!ApiError::Cancelled.is_argument_error());
        assert_eq!(
            require("tenant_id", "").unwrap_err().to_string(),
            "argument cannot be empty: tenant_id"
        );
        assert!(require("tenant_id", "t-1").is_ok());
    }
}
