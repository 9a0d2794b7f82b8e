//! Transport for backend callable functions.
//!
//! A callable function takes a JSON payload wrapped as `{"data": ...}` and
//! answers either `{"result": ...}` or `{"error": {"status", "message"}}`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::config::DiscoveryConfig;
use crate::error::Result;

/// Status vocabulary of callable-function errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallableErrorCode {
    /// Caller is not signed in
    Unauthenticated,
    /// A quota or rate limit was hit
    ResourceExhausted,
    /// The payload was rejected
    InvalidArgument,
    /// Caller lacks rights for the function
    PermissionDenied,
    /// Function does not exist
    NotFound,
    /// Request timed out
    DeadlineExceeded,
    /// Backend or network unreachable
    Unavailable,
    /// Server-side failure
    Internal,
    /// Any code not listed above, kept verbatim
    Other(String),
}

impl CallableErrorCode {
    /// Parse either `resource-exhausted` or `RESOURCE_EXHAUSTED` forms
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        let normalized = normalized.strip_prefix("functions/").unwrap_or(&normalized);

        match normalized {
            "unauthenticated" => Self::Unauthenticated,
            "resource-exhausted" => Self::ResourceExhausted,
            "invalid-argument" => Self::InvalidArgument,
            "permission-denied" => Self::PermissionDenied,
            "not-found" => Self::NotFound,
            "deadline-exceeded" => Self::DeadlineExceeded,
            "unavailable" => Self::Unavailable,
            "internal" => Self::Internal,
            other => Self::Other(other.to_string()),
        }
    }

    /// Code implied by an HTTP status when the body carries none
    #[must_use]
    pub fn from_http_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::InvalidArgument,
            StatusCode::UNAUTHORIZED => Self::Unauthenticated,
            StatusCode::FORBIDDEN => Self::PermissionDenied,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::TOO_MANY_REQUESTS => Self::ResourceExhausted,
            StatusCode::SERVICE_UNAVAILABLE => Self::Unavailable,
            StatusCode::GATEWAY_TIMEOUT => Self::DeadlineExceeded,
            _ => Self::Internal,
        }
    }

    /// Lowercase-dashed form
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::ResourceExhausted => "resource-exhausted",
            Self::InvalidArgument => "invalid-argument",
            Self::PermissionDenied => "permission-denied",
            Self::NotFound => "not-found",
            Self::DeadlineExceeded => "deadline-exceeded",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for CallableErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a callable function
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct CallableError {
    /// Error status
    pub code: CallableErrorCode,
    /// Server message, unmodified
    pub message: String,
}

impl CallableError {
    /// Build an error from a code and message
    pub fn new(code: CallableErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Outcome of a callable-function invocation
pub type CallResult = std::result::Result<Value, CallableError>;

/// Invokes named backend functions.
///
/// The caller's identity travels with the transport's credential, never in
/// the payload.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FunctionsTransport: Send + Sync {
    /// Call `name` with `payload` and return its result
    async fn call(&self, name: &str, payload: Value) -> CallResult;
}

#[derive(Serialize)]
struct CallableRequest<'a> {
    data: &'a Value,
}

#[derive(Deserialize)]
struct CallableEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<CallableErrorBody>,
}

#[derive(Deserialize)]
struct CallableErrorBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Callable-function transport over HTTPS
#[derive(Debug, Clone)]
pub struct HttpFunctionsTransport {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpFunctionsTransport {
    /// Build a transport from the discovery configuration
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.functions_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{name}", self.base_url)
    }
}

fn transport_error(err: &reqwest::Error) -> CallableError {
    let code = if err.is_timeout() {
        CallableErrorCode::DeadlineExceeded
    } else {
        CallableErrorCode::Unavailable
    };
    CallableError::new(code, err.to_string())
}

/// Interpret a callable-function response body
fn parse_response(status: StatusCode, body: &str) -> CallResult {
    let envelope = serde_json::from_str::<CallableEnvelope>(body).ok();

    match envelope {
        Some(CallableEnvelope {
            error: Some(error), ..
        }) => {
            let code = error.status.as_deref().map_or_else(
                || CallableErrorCode::from_http_status(status),
                CallableErrorCode::parse,
            );
            let message = error.message.unwrap_or_else(|| status.to_string());
            Err(CallableError::new(code, message))
        }
        Some(CallableEnvelope {
            result: Some(result),
            ..
        }) if status.is_success() => Ok(result),
        _ if !status.is_success() => Err(CallableError::new(
            CallableErrorCode::from_http_status(status),
            format!("Request failed with status {status}"),
        )),
        _ => Err(CallableError::new(
            CallableErrorCode::Internal,
            "Response is missing a result",
        )),
    }
}

#[async_trait]
impl FunctionsTransport for HttpFunctionsTransport {
    async fn call(&self, name: &str, payload: Value) -> CallResult {
        let mut request = self
            .client
            .post(self.endpoint(name))
            .json(&CallableRequest { data: &payload });

        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(&e))?;

        tracing::debug!(function = name, status = status.as_u16(), "Callable function responded");
        parse_response(status, &body)
    }
}
