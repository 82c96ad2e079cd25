//! # Platform HTTP Client
//!
//! Wrapper around the platform REST API.
//!
//! Requests are plain `ApiRequest` values executed by an `HttpTransport`.
//! `ReqwestTransport` is the production transport; tests substitute their
//! own. `ArcherClient` sits on top and turns HTTP statuses and response
//! envelopes into `ArcherError`s.

use archer_link_core::{ArcherError, Envelope};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// `Accept` header sent with every request.
pub const ACCEPT: &str =
    "application/json,text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

// =============================================================================
// REQUESTS
// =============================================================================

/// How a request authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Internal session: the host's anti-forgery token.
    Csrf(String),
    /// External session: the token returned by login.
    SessionToken(String),
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csrf(_) => f.write_str("Csrf(..)"),
            Self::SessionToken(_) => f.write_str("SessionToken(..)"),
        }
    }
}

impl Authorization {
    /// Header name and value carrying this authorization.
    #[must_use]
    pub fn header(&self) -> (&'static str, String) {
        match self {
            Self::Csrf(token) => ("x-csrf-token", token.clone()),
            Self::SessionToken(token) => {
                ("Authorization", format!("Archer session-id=\"{token}\""))
            }
        }
    }
}

/// A request ready to be executed.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub auth: Option<Authorization>,
    pub body: Option<Value>,
    /// Sent as `X-Http-Method-Override`.
    pub method_override: Option<Method>,
}

impl ApiRequest {
    /// Unauthenticated request without a body.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            auth: None,
            body: None,
            method_override: None,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: Authorization) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_override(mut self, method: Method) -> Self {
        self.method_override = Some(method);
        self
    }

    /// The method the platform will act on (override wins).
    #[must_use]
    pub fn effective_method(&self) -> &Method {
        self.method_override.as_ref().unwrap_or(&self.method)
    }

    /// Full header set for this request.
    #[must_use]
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Cache-Control", "no-cache".to_string()),
            ("Accept", ACCEPT.to_string()),
            ("Content-Type", "application/json".to_string()),
        ];
        if let Some(method) = &self.method_override {
            headers.push(("X-Http-Method-Override", method.to_string()));
        }
        if let Some(auth) = &self.auth {
            headers.push(auth.header());
        }
        headers
    }
}

/// Body for a filtered GET sent as a POST.
#[must_use]
pub fn filter_body(filter: &str) -> Value {
    serde_json::json!({ "Value": filter })
}

/// Raw HTTP outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Executes requests. Connection failures are `ArcherError::Api` with
/// code 0; any HTTP status, including errors, is returned as a response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ArcherError>;
}

/// `HttpTransport` over a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, TLS roots, timeouts).
    #[must_use]
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ArcherError> {
        let mut builder = self.http.request(request.method.clone(), &request.url);
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ArcherError::api(0, format!("Cannot connect to {}: {e}", request.url)))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ArcherError::api(status, format!("Unreadable response body: {e}")))?;

        Ok(ApiResponse { status, body })
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// Status- and envelope-aware client.
#[derive(Clone)]
pub struct ArcherClient {
    transport: Arc<dyn HttpTransport>,
}

impl ArcherClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Execute and require a 2xx status.
    ///
    /// 401 becomes `Authentication`; any other failure status becomes
    /// `Api { code, text }` with the response body as text.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ArcherError> {
        tracing::debug!(
            method = %request.effective_method(),
            url = %request.url,
            "Sending platform request"
        );
        let response = self.transport.execute(request).await?;
        check_status(response)
    }

    /// Execute and decode a single envelope.
    pub async fn requested<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        context: &str,
    ) -> Result<T, ArcherError> {
        let response = self.execute(request).await?;
        let envelope: Envelope<T> = decode(&response)?;
        envelope.into_requested(response.status, context)
    }

    /// Execute and decode a JSON array of envelopes.
    pub async fn requested_list<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        context: &str,
    ) -> Result<Vec<T>, ArcherError> {
        let response = self.execute(request).await?;
        let envelopes: Vec<Envelope<T>> = decode(&response)?;
        envelopes
            .into_iter()
            .map(|envelope| envelope.into_requested(response.status, context))
            .collect()
    }
}

fn check_status(response: ApiResponse) -> Result<ApiResponse, ArcherError> {
    match response.status {
        200..=299 => Ok(response),
        401 => Err(ArcherError::Authentication(if response.body.is_empty() {
            "session is not authorized".to_string()
        } else {
            response.body
        })),
        code => {
            let text = if response.body.is_empty() {
                format!("request failed with status {code}")
            } else {
                response.body
            };
            Err(ArcherError::Api { code, text })
        }
    }
}

fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<T, ArcherError> {
    serde_json::from_str(&response.body)
        .map_err(|e| ArcherError::api(response.status, format!("Malformed response body: {e}")))
}

// =============================================================================
// TESTS
// =============================================================================
