#![forbid(unsafe_code)]

//! Error taxonomy shared by every pipeline stage.
//!
//! Nothing here is fatal: callers receive one terminal `PipelineError` and
//! decide whether to retry the whole run.

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Rejected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("operation cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Upstream sub-kind, when the failure came from the platform or the wire.
    pub fn upstream_kind(&self) -> Option<UpstreamKind> {
        match self {
            Self::Upstream(err) => Some(err.kind),
            _ => None,
        }
    }
}

/// Subtypes of upstream failures worth telling the user apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    InvalidApiKey,
    QuotaExceeded,
    Other,
}

impl fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UpstreamKind::InvalidApiKey => "invalid or expired API key",
            UpstreamKind::QuotaExceeded => "API quota exceeded",
            UpstreamKind::Other => "upstream request failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind} (status: {}): {message}", status_label(.status))]
pub struct UpstreamError {
    pub kind: UpstreamKind,
    /// HTTP status when the platform answered; `None` for network-level failures.
    pub status: Option<u16>,
    pub message: String,
    /// `error.errors[].reason` values reported by the platform.
    pub reasons: Vec<String>,
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |code| code.to_string())
}

impl UpstreamError {
    /// Failure before any HTTP status was received (DNS, TLS, reset, ...).
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamKind::Other,
            status: None,
            message: message.into(),
            reasons: Vec::new(),
        }
    }

    /// Builds an error from a non-success HTTP answer, classifying it from the
    /// status code and the platform's JSON error envelope.
    pub fn from_status(status: u16, body: &str) -> Self {
        let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
        let reasons: Vec<String> = envelope
            .as_ref()
            .map(|envelope| {
                envelope
                    .error
                    .errors
                    .iter()
                    .filter_map(|detail| detail.reason.clone())
                    .collect()
            })
            .unwrap_or_default();
        let message = envelope
            .and_then(|envelope| envelope.error.message)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| body.trim().to_string());

        Self {
            kind: classify_upstream(Some(status), &reasons, &message),
            status: Some(status),
            message,
            reasons,
        }
    }

    pub fn has_reason(&self, reason: &str) -> bool {
        self.reasons.iter().any(|candidate| candidate == reason)
    }
}

/// `{"error": {"code": 403, "message": "...", "errors": [{"reason": "quotaExceeded"}]}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

const KEY_REASONS: &[&str] = &["keyInvalid", "keyExpired", "API_KEY_INVALID", "authError"];
const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "dailyLimitExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
];

/// Structured reasons win; message sniffing only runs when the platform sent
/// no recognisable reason.
pub fn classify_upstream(status: Option<u16>, reasons: &[String], message: &str) -> UpstreamKind {
    if reasons
        .iter()
        .any(|reason| KEY_REASONS.contains(&reason.as_str()))
    {
        return UpstreamKind::InvalidApiKey;
    }
    if reasons
        .iter()
        .any(|reason| QUOTA_REASONS.contains(&reason.as_str()))
    {
        return UpstreamKind::QuotaExceeded;
    }
    if status == Some(401) {
        return UpstreamKind::InvalidApiKey;
    }
    if !reasons.is_empty() {
        return UpstreamKind::Other;
    }

    let lowered = message.to_lowercase();
    if lowered.contains("quota") {
        UpstreamKind::QuotaExceeded
    } else if lowered.contains("api key not valid")
        || lowered.contains("invalid key")
        || lowered.contains("key expired")
        || lowered.contains("api key expired")
    {
        UpstreamKind::InvalidApiKey
    } else {
        UpstreamKind::Other
    }
}
