//! Errors raised by trip data sources.

/// Result type for trip data source calls.
pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request never produced a response (connect, TLS, timeout).
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Credentials were rejected, even after signing in again.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A required setting (secret, base URL, credentials) is absent.
    #[error("Source not configured: {0}")]
    NotConfigured(String),
}

impl SourceError {
    pub fn transport(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            message: err.to_string(),
        }
    }

    pub fn decode(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            url: url.into(),
            message: err.to_string(),
        }
    }
}
