//! Typed errors for the argmap library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell
//! configuration problems apart from backend failures and cancellations.

use thiserror::Error;

/// Errors that can occur while reconstructing and scoring an argument map.
#[derive(Debug, Error)]
pub enum ArgmapError {
    /// Plan or configuration is invalid (raised before any backend call)
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Backing model or classifier failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A hard prerequisite of a stage was not produced
    #[error("missing artifact `{required}` required by `{product}`")]
    MissingArtifact { product: String, required: String },

    /// Run was cancelled before all products were built
    #[error("analysis cancelled after {} completed products", completed.len())]
    Cancelled { completed: Vec<String> },

    /// Graph export failed (e.g. `dot` executable missing)
    #[error("export error: {0}")]
    Export(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// I/O error while talking to an external process
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors, fatal and raised immediately.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Requested artifact or metric has no registered producer
    #[error("unknown artifact or metric: {0}")]
    UnknownProduct(String),

    /// Requested key collides with an input id
    #[error("`{0}` is an input and cannot be requested as a product")]
    InputCollision(String),

    /// Declared requirements form a cycle
    #[error("cyclic requirements: {}", .0.join(" -> "))]
    CyclicRequirements(Vec<String>),

    /// Input ids are not unique
    #[error("duplicate input id: {0}")]
    DuplicateInput(String),

    /// Invalid setting value
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Errors reported by backend clients.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Service signalled rate limiting
    #[error("rate limit exceeded")]
    RateLimited,

    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connection(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Credentials or endpoint missing
    #[error("backend not configured: {0}")]
    NotConfigured(String),
}

impl BackendError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Timeout | BackendError::RateLimited | BackendError::Connection(_) => {
                true
            }
            BackendError::Http { status, .. } => *status == 429 || *status >= 500,
            BackendError::InvalidResponse(_) | BackendError::NotConfigured(_) => false,
        }
    }
}

#[cfg(any(feature = "openai", feature = "hf"))]
impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_connect() || e.is_request() {
            BackendError::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            BackendError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            BackendError::InvalidResponse(e.to_string())
        }
    }
}

impl ArgmapError {
    /// Whether the error is a transient backend failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, ArgmapError::Backend(e) if e.is_transient())
    }
}

/// Result type alias for argmap operations.
pub type Result<T> = std::result::Result<T, ArgmapError>;
