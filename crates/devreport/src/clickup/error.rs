//! Error types for ClickUp API operations.

use thiserror::Error;

use crate::report::SourceError;
use crate::transport::TransportError;

/// Errors that can occur when talking to the ClickUp API.
#[derive(Debug, Clone, Error)]
pub enum ClickUpError {
    /// The request never produced a usable response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// API returned a non-success response that was not retried.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(String),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(String),
}

impl From<serde_json::Error> for ClickUpError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<url::ParseError> for ClickUpError {
    fn from(err: url::ParseError) -> Self {
        Self::Url(err.to_string())
    }
}

impl ClickUpError {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_cancelled())
    }
}

/// Any non-2xx or transport failure means the service is unavailable;
/// undecodable payloads and bad URLs are internal errors.
impl From<ClickUpError> for SourceError {
    fn from(err: ClickUpError) -> Self {
        match err {
            e if e.is_cancelled() => SourceError::Cancelled,
            ClickUpError::Api { status, body } if status == 401 || status == 403 => {
                SourceError::unavailable(format!("authentication failed ({status}): {body}"))
            }
            e @ (ClickUpError::Api { .. } | ClickUpError::Transport(_)) => {
                SourceError::unavailable(e.to_string())
            }
            other => SourceError::internal(other.to_string()),
        }
    }
}

/// Get a short error message suitable for display.
pub fn short_error_message(err: &ClickUpError) -> String {
    match err {
        ClickUpError::Transport(TransportError::RetriesExhausted { attempts, .. }) => {
            format!("gave up after {attempts} attempts")
        }
        ClickUpError::Transport(TransportError::Cancelled) => "Cancelled".to_string(),
        ClickUpError::Transport(_) => "Network error".to_string(),
        ClickUpError::Api { status, body } => {
            if body.chars().count() > 50 {
                let truncated: String = body.chars().take(47).collect();
                format!("HTTP {status}: {truncated}...")
            } else {
                format!("HTTP {status}: {body}")
            }
        }
        ClickUpError::Json(_) => "JSON parse error".to_string(),
        ClickUpError::Url(msg) => format!("URL: {msg}"),
    }
}
