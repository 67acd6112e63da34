//! Failure taxonomy for gateway calls.
//!
//! Both error types travel inside `anyhow::Error`; the request lifecycle downcasts to pick the
//! message shown to the user.

use thiserror::Error;

/// Local, pre-call rejection of user input. No network call was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A remote call failed: rejected request, non-success status, transport failure (timeouts
/// included) or a body that does not decode.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{operation}: invalid request: {reason}")]
    InvalidRequest {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation}: HTTP {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status {
        operation: &'static str,
        status: u16,
        detail: Option<String>,
        body: String,
    },

    #[error("{operation}: request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation}: malformed response: {reason}")]
    Malformed {
        operation: &'static str,
        reason: String,
    },
}

impl ServiceError {
    /// Structured, user-presentable detail supplied by the service, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ServiceError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ServiceError::Transport { source, .. } if source.is_timeout())
    }
}

/// Extracts `detail` from an error body shaped like `{"detail": "..."}`.
///
/// Non-string details (e.g. lists of field errors) and blank strings yield `None`.
pub fn detail_from_body(body: &str) -> Option<String> {
    let value = serde_json::from_str::<serde_json::Value>(body).ok()?;
    let detail = value.get("detail")?.as_str()?.trim();
    if detail.is_empty() {
        return None;
    }
    Some(detail.to_string())
}
