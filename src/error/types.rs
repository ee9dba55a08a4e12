//! Error type definitions
//!
//! Defines the main error types used throughout the Buckler client.

use std::sync::Arc;
use thiserror::Error;

/// Main error type for the Buckler client
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an unusable argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Login finished without the portal session cookies
    #[error("Session not established: portal session cookies missing after login")]
    SessionNotEstablished,

    /// The build identifier could not be extracted, even after one redirect
    #[error("Build identifier not found in portal page: {url}")]
    BuildIdNotFound { url: String },

    /// The redirect walk exceeded its hop bound
    #[error("Redirect chain too long: more than {hops} redirects")]
    RedirectChainTooLong { hops: usize },

    /// Key material is not exactly 32 bytes as raw, base64 or hex
    #[error("Invalid key: {reason}")]
    InvalidKey { reason: String },

    /// Sealed envelope shorter than nonce plus tag
    #[error("Ciphertext too short: {len} bytes")]
    CiphertextTooShort { len: usize },

    /// Authentication tag mismatch or undecodable envelope text
    #[error("Decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    /// Non-success status from an endpoint that is not retried
    #[error("Upstream returned status {code} for {url}")]
    UpstreamStatus { code: u16, url: String },

    /// A request exceeded its caller's deadline
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    /// Response body did not decode into the expected shape
    #[error("Decode error ({context}): {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// URL construction or parsing errors
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Cookie jar errors
    #[error("Cookie error: {0}")]
    Cookie(String),

    /// Outcome of a login shared between concurrent callers
    #[error("Login failed: {0}")]
    Login(Arc<Error>),

    /// Network/HTTP client errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a build identifier error for the page that lacked it
    pub fn build_id_not_found(url: impl Into<String>) -> Self {
        Self::BuildIdNotFound { url: url.into() }
    }

    /// Create an invalid key error
    pub fn invalid_key(reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            reason: reason.into(),
        }
    }

    /// Create a decryption error
    pub fn decryption_failed(reason: impl Into<String>) -> Self {
        Self::DecryptionFailed {
            reason: reason.into(),
        }
    }

    /// Create an upstream status error
    pub fn upstream_status(code: u16, url: impl Into<String>) -> Self {
        Self::UpstreamStatus {
            code,
            url: url.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Create a decode error with the payload it came from
    pub fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }

    /// Create a cookie jar error
    pub fn cookie(msg: impl Into<String>) -> Self {
        Self::Cookie(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Unwrap shared login outcomes down to the error that caused them.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Login(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// Transport failures abort a login; everything else is a soft non-finding
    /// when it happens inside a fallback strategy.
    pub fn is_transport(&self) -> bool {
        match self.root_cause() {
            Self::Network(_) | Self::Timeout { .. } | Self::Io(_) => true,
            _ => false,
        }
    }

    /// Status code carried by an [`Error::UpstreamStatus`].
    pub fn status_code(&self) -> Option<u16> {
        match self.root_cause() {
            Self::UpstreamStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}
