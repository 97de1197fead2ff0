//! Error taxonomy shared by the external collaborators.
//!
//! Two kinds of failure cross module boundaries:
//! - [`ProviderError`]: a backend (embeddings, language model, search, blob
//!   reads) could not be reached or answered with an error. Callers retry
//!   these or surface them as a run failure.
//! - [`ParseError`]: a backend answered, but the payload did not match the
//!   expected shape. These never leave the component that detected them;
//!   they are turned into a fixed fallback value on the spot.

use std::time::Duration;

use thiserror::Error;

/// Failure talking to an external backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{service} returned HTTP {status}: {body}")]
    Http {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} request failed: {cause}")]
    Transport {
        service: &'static str,
        cause: String,
    },

    #[error("{service} did not answer within {}s", timeout.as_secs())]
    Timeout {
        service: &'static str,
        timeout: Duration,
    },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("{service} returned an unexpected payload: {reason}")]
    Protocol {
        service: &'static str,
        reason: String,
    },

    #[error("Provider is not configured: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Convert a reqwest failure for `service` into a provider error.
    pub fn from_reqwest(service: &'static str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout { service, timeout };
        }
        if let Some(status) = err.status() {
            return Self::Http {
                service,
                status: status.as_u16(),
                body: err.to_string(),
            };
        }
        Self::Transport {
            service,
            cause: err.to_string(),
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Timeouts, connection failures, throttling (429) and server errors
    /// (5xx) are transient. Everything else fails the same way twice.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result type for calls to external backends.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Model output that could not be decoded into the expected structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("model output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("model output does not match schema '{schema}': {reason}")]
    SchemaMismatch { schema: String, reason: String },

    #[error("model returned no content")]
    Empty,
}
