use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    analysis::{AnalysisRequest, HttpMethod, RequestScope},
    config::{BackendConfig, NetworkConfig},
};

/// JSON object returned by the backend for one analysis.
pub type Payload = Map<String, Value>;

/// Result of one analysis request, produced exactly once per run.
pub type AnalysisOutcome = std::result::Result<Payload, FetchError>;

/// Coarse failure category, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ConnectionError,
    Timeout,
    HttpError(u16),
    MalformedResponse,
    UnknownAnalysisType,
    Unknown,
}

/// Everything that can go wrong while fetching an analysis.
///
/// Cloneable so it can travel inside UI messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Cannot connect to the analytics backend at {url}. Please ensure the backend is running. ({detail})")]
    Connection { url: String, detail: String },
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("API Error: {status} - {body}")]
    Http { status: u16, body: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Unknown analysis type: {0}")]
    UnknownAnalysisType(String),
    #[error("Analysis rejected by backend: {0}")]
    Rejected(String),
    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Connection { .. } => FailureKind::ConnectionError,
            FetchError::Timeout(_) => FailureKind::Timeout,
            FetchError::Http { status, .. } => FailureKind::HttpError(*status),
            FetchError::MalformedResponse(_) => FailureKind::MalformedResponse,
            FetchError::UnknownAnalysisType(_) => FailureKind::UnknownAnalysisType,
            FetchError::Rejected(_) | FetchError::Unknown(_) => FailureKind::Unknown,
        }
    }
}

/// Status and body of a response that arrived, before decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Decode a received response into an outcome.
///
/// 200 with a JSON object is success; the `{success, data, message}` envelope
/// of the filtered endpoints is unwrapped to its `data`.
pub fn decode(raw: RawResponse) -> AnalysisOutcome {
    if raw.status != 200 {
        return Err(FetchError::Http {
            status: raw.status,
            body: raw.body,
        });
    }

    let value: Value = serde_json::from_str(&raw.body)
        .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

    let Value::Object(object) = value else {
        return Err(FetchError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    };

    unwrap_envelope(object)
}

fn unwrap_envelope(mut object: Payload) -> AnalysisOutcome {
    let is_envelope = matches!(object.get("success"), Some(Value::Bool(_)))
        && object.contains_key("data");
    if !is_envelope {
        return Ok(object);
    }

    if object.get("success") == Some(&Value::Bool(false)) {
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no reason given")
            .to_string();
        return Err(FetchError::Rejected(message));
    }

    match object.remove("data") {
        Some(Value::Object(data)) => Ok(data),
        Some(Value::Null) | None => Ok(Payload::new()),
        Some(other) => Err(FetchError::MalformedResponse(format!(
            "envelope data is {}, expected an object",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// API client for the analytics backend.
#[derive(Clone, Debug)]
pub struct AnalyticsClient {
    client: reqwest::Client,
    root: String,
    lookup_timeout: Duration,
    analysis_timeout: Duration,
    health_timeout: Duration,
}

impl AnalyticsClient {
    /// Create a new client rooted at the configured analytics path.
    pub fn new(backend: &BackendConfig, network: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(network.connect_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            root: backend.analytics_root(),
            lookup_timeout: Duration::from_secs(network.lookup_timeout_secs),
            analysis_timeout: Duration::from_secs(network.analysis_timeout_secs),
            health_timeout: Duration::from_secs(network.health_timeout_secs),
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Full URL a request goes to.
    pub fn url_for(&self, request: &AnalysisRequest) -> String {
        format!("{}{}", self.root, request.endpoint().path)
    }

    /// Deadline applied to a request of the given scope.
    pub fn timeout_for(&self, scope: RequestScope) -> Duration {
        match scope {
            RequestScope::Snapshot => self.lookup_timeout,
            RequestScope::Filtered => self.analysis_timeout,
        }
    }

    /// Fetch one analysis and decode the answer.
    pub async fn fetch(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let raw = self.send(request).await?;
        decode(raw)
    }

    /// Send the request and read the body, without interpreting it.
    pub async fn send(&self, request: &AnalysisRequest) -> std::result::Result<RawResponse, FetchError> {
        let url = self.url_for(request);
        let timeout = self.timeout_for(request.scope);
        let endpoint = request.endpoint();

        tracing::debug!(
            analysis = %request.analysis,
            method = ?endpoint.method,
            %url,
            "Sending analytics request"
        );

        let builder = match endpoint.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url).json(&request.body()),
        };

        let response = builder
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.classify(e, timeout))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify(e, timeout))?;

        Ok(RawResponse { status, body })
    }

    /// Query the health endpoint. Any failure reads as unhealthy.
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/health", self.root);
        match self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => {
                let healthy = response.status().as_u16() == 200;
                tracing::debug!(%url, status = %response.status(), healthy, "Health check");
                healthy
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "Health check failed");
                false
            }
        }
    }

    fn classify(&self, error: reqwest::Error, timeout: Duration) -> FetchError {
        self.failure(error.is_connect(), error.is_timeout(), error.to_string(), timeout)
    }

    /// A connect-phase failure is a connection error even when it timed out.
    fn failure(&self, connect: bool, timed_out: bool, detail: String, timeout: Duration) -> FetchError {
        if connect {
            FetchError::Connection {
                url: self.root.clone(),
                detail,
            }
        } else if timed_out {
            FetchError::Timeout(timeout.as_secs())
        } else {
            FetchError::Unknown(detail)
        }
    }
}
