//! Xelon API transport client
//!
//! Builds JSON requests against a base URL, injects the bearer credential,
//! executes them and maps every failure to [`ApiError`]. URLs placed in
//! errors or logs always go through [`redact_url`].

use crate::auth::Credentials;
use crate::devices::Devices;
use crate::error::{ApiError, ErrorEnvelope, ErrorResponse, Result};
use crate::login::Login;
use crate::redact::redact_url;
use crate::ssh::SshKeys;
use crate::tenant::Tenants;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue, USER_AGENT};
use reqwest::{Method, Request, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Base URL of the public Xelon VDC service API
pub const DEFAULT_BASE_URL: &str = "https://vdc.xelon.ch/api/service/";

pub const DEFAULT_USER_AGENT: &str = concat!("xelon-machine/", env!("CARGO_PKG_VERSION"));

/// Deadline applied to each outbound call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Body argument for requests without a payload
pub const NO_BODY: Option<&()> = None;

/// Configuration for [`Client`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for API requests; must end with a trailing slash
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub credentials: Credentials,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            credentials,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for the Xelon REST API.
///
/// Holds no per-call state; the underlying connection pool is shared by
/// every request issued through it.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    user_agent: HeaderValue,
    credentials: Credentials,
    cancel: CancellationToken,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        let user_agent = HeaderValue::from_str(&config.user_agent).map_err(|_| {
            ApiError::Configuration(format!("invalid user agent {:?}", config.user_agent))
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            user_agent,
            credentials: config.credentials,
            cancel: CancellationToken::new(),
        })
    }

    /// Tie every call made through this client to `token`
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn devices(&self) -> Devices<'_> {
        Devices::new(self)
    }

    pub fn ssh_keys(&self) -> SshKeys<'_> {
        SshKeys::new(self)
    }

    pub fn tenant(&self) -> Tenants<'_> {
        Tenants::new(self)
    }

    pub fn login(&self) -> Login<'_> {
        Login::new(self)
    }

    /// Create an API request.
    ///
    /// `path` is resolved relative to the base URL and should not start with
    /// a slash. When `body` is given it is JSON encoded as the payload. No
    /// `Authorization` header is set here; [`Client::execute`] adds one.
    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Request> {
        if !self.base_url.path().ends_with('/') {
            return Err(ApiError::Configuration(format!(
                "base URL must have a trailing slash, but {:?} does not",
                self.base_url.as_str()
            )));
        }
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::Configuration(format!("invalid request path {path:?}: {e}")))?;

        let mut request = Request::new(method, url);
        if let Some(body) = body {
            let payload = serde_json::to_vec(body).map_err(ApiError::Encode)?;
            *request.body_mut() = Some(payload.into());
        }

        let headers = request.headers_mut();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, self.user_agent.clone());

        Ok(request)
    }

    /// Build a request for an endpoint given as path segments and query pairs.
    /// Segments are percent-encoded, so opaque identifiers cannot alter the path.
    pub(crate) fn endpoint<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Request> {
        let mut request = self.build_request(method, "", body)?;
        {
            let url = request.url_mut();
            url.path_segments_mut()
                .map_err(|_| {
                    ApiError::Configuration("base URL cannot carry a path".to_string())
                })?
                .pop_if_empty()
                .extend(segments);
            if !query.is_empty() {
                url.query_pairs_mut().extend_pairs(query);
            }
        }
        Ok(request)
    }

    /// Execute `request` and JSON-decode a 2xx body.
    ///
    /// Returns `Ok(None)` for an empty body.
    pub async fn execute<T: DeserializeOwned>(&self, request: Request) -> Result<Option<T>> {
        let request = self.authorize(request).await?;
        self.execute_unauthenticated(request).await
    }

    /// Execute `request`, discarding any 2xx body
    pub async fn execute_empty(&self, request: Request) -> Result<StatusCode> {
        let request = self.authorize(request).await?;
        let response = self.send(request).await?;
        Ok(response.status())
    }

    /// Execute `request` and stream a 2xx body into `sink`, returning the byte count
    pub async fn execute_into<W>(&self, request: Request, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let request = self.authorize(request).await?;
        let method = request.method().clone();
        let url = redact_url(request.url());
        let mut response = self.send(request).await?;

        let mut written = 0u64;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ApiError::Cancelled),
                chunk = response.chunk() => chunk.map_err(|e| self.transport_error(&method, &url, e))?,
            };
            let Some(chunk) = chunk else { break };
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        Ok(written)
    }

    /// Execute without credential injection. Used for the login exchange.
    pub(crate) async fn execute_unauthenticated<T: DeserializeOwned>(
        &self,
        request: Request,
    ) -> Result<Option<T>> {
        let method = request.method().clone();
        let url = redact_url(request.url());
        let response = self.send(request).await?;
        let body = self.read_body(&method, &url, response).await?;

        if is_blank(&body) {
            return Ok(None);
        }
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|source| ApiError::Decode {
                method,
                url,
                status: None,
                source,
            })
    }

    /// Attach `Authorization: Bearer <token>` unless the request already has one
    async fn authorize(&self, mut request: Request) -> Result<Request> {
        if request.headers().contains_key(AUTHORIZATION) {
            return Ok(request);
        }

        let token = self.credentials.bearer(self).await?;
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            ApiError::AuthenticationFailed("bearer token is not a valid header value".to_string())
        })?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);

        Ok(request)
    }

    /// Perform the call and turn non-2xx responses into [`ApiError::Api`]
    async fn send(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let url = redact_url(request.url());
        tracing::debug!("{} {}", method, url);

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            result = self.http.execute(request) => result,
        };
        let response = result.map_err(|e| self.transport_error(&method, &url, e))?;

        self.check_response(method, url, response).await
    }

    async fn check_response(&self, method: Method, url: String, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = self.read_body(&method, &url, response).await?;
        let envelope = if is_blank(&body) {
            ErrorEnvelope::default()
        } else {
            match serde_json::from_slice::<ErrorEnvelope>(&body) {
                Ok(envelope) => envelope,
                Err(source) => {
                    return Err(ApiError::Decode {
                        method,
                        url,
                        status: Some(status),
                        source,
                    });
                }
            }
        };

        tracing::debug!("{} {} failed with {}", method, url, status);
        Err(ApiError::Api(ErrorResponse {
            method,
            url,
            status,
            envelope,
        }))
    }

    async fn read_body(&self, method: &Method, url: &str, response: Response) -> Result<Vec<u8>> {
        let bytes = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            bytes = response.bytes() => bytes.map_err(|e| self.transport_error(method, url, e))?,
        };
        Ok(bytes.to_vec())
    }

    /// Cancellation takes precedence over whatever the transport reported.
    /// The reqwest error is stripped of its own (unredacted) URL.
    fn transport_error(&self, method: &Method, url: &str, error: reqwest::Error) -> ApiError {
        if self.cancel.is_cancelled() {
            return ApiError::Cancelled;
        }
        ApiError::Transport {
            method: method.clone(),
            url: url.to_string(),
            source: error.without_url(),
        }
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    Url::parse(base_url)
        .map_err(|e| ApiError::Configuration(format!("invalid base URL {base_url:?}: {e}")))
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}
