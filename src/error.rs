//! Error types for Upwind API operations.

use thiserror::Error;

/// Errors that can occur during Upwind API operations.
#[derive(Debug, Error)]
pub enum UpwindError {
    /// Configuration is missing or invalid.
    #[error("Upwind configuration error: {0}")]
    Config(String),

    /// I/O error reading a configuration file or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The OAuth2 client-credentials exchange failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Rate limited and the retry budget is spent.
    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The server kept failing with a 5xx status.
    #[error("Upwind server error {status}: {body}")]
    Server { status: u16, body: String },

    /// Any other non-success status reported by the API.
    #[error("Upwind API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Entity not found.
    #[error("{entity_type} '{id}' not found")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// JSON parsing error.
    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A list producer stopped without reporting how it ended.
    #[error("List stream interrupted: {0}")]
    Interrupted(String),

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl UpwindError {
    /// Whether this error kind is transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RateLimited { .. } | Self::Server { .. }
        )
    }

    /// Whether this error was caused by caller cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status code carried by the error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::NotFound { .. } => Some(404),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for Upwind operations.
pub type Result<T> = core::result::Result<T, UpwindError>;
