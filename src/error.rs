use serde_json::{json, Value};
use thiserror::Error;

/// Everything that can stop a report from being created.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("AffectedVersion is required")]
    MissingVersion,
    /// Names the environment variable that was absent.
    #[error("Server configuration error")]
    Configuration(&'static str),
    /// Confluence answered with a non-2xx status.
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
        details: Value,
    },
    /// No response came back at all (connect failure, timeout, ...).
    #[error("Network error - unable to connect to Confluence")]
    Network(String),
    #[error(transparent)]
    MalformedRequest(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

impl ReportError {
    pub fn status(&self) -> u16 {
        match self {
            ReportError::MissingVersion => 400,
            ReportError::Upstream { status, .. } => *status,
            _ => 500,
        }
    }

    /// JSON body sent back to the caller.
    pub fn to_json(&self) -> Value {
        let error = self.to_string();
        match self {
            ReportError::MissingVersion | ReportError::Configuration(_) => json!({ "error": error }),
            ReportError::Upstream { details, .. } => json!({ "error": error, "details": details }),
            ReportError::Network(cause) => json!({ "error": error, "details": cause }),
            ReportError::MalformedRequest(_) | ReportError::Other(_) => {
                json!({ "error": error, "details": error })
            }
        }
    }

    /// Builds an upstream error from the status line and raw response text.
    ///
    /// The message comes from the payload's `message` field when there is one,
    /// otherwise from the status line. Payloads that are not JSON are kept as a
    /// plain string in `details`.
    pub fn from_upstream(status: u16, reason: Option<&str>, text: &str) -> Self {
        let fallback = format!("HTTP {}: {}", status, reason.unwrap_or(""));
        let details = if text.trim().is_empty() {
            Value::String(fallback.clone())
        } else {
            serde_json::from_str::<Value>(text).unwrap_or_else(|_| Value::String(text.to_string()))
        };
        let message = details
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or(fallback);
        ReportError::Upstream {
            status,
            message,
            details,
        }
    }
}
