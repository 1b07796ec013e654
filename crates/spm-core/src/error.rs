//! Error types for policy-manager client operations.
//!
//! Only programming mistakes (bad configuration, malformed URLs, mutually
//! exclusive arguments) surface as [`Error`]. Runtime conditions such as
//! validation failures, version gating, and transport faults are reported as
//! [`crate::outcome::Outcome::NotPerformed`] instead; see the `outcome`
//! module.

use thiserror::Error;

/// Main error type for policy-manager client operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid client or descriptor configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Mutually exclusive arguments were both supplied (or neither was)
    #[error("Exclusive arguments: {0}")]
    ExclusiveArguments(String),

    /// A URL template placeholder could not be resolved
    #[error("Unresolved placeholder `{placeholder}` in `{template}`")]
    UnresolvedPlaceholder {
        /// Placeholder name without braces
        placeholder: String,
        /// The template that contained it
        template: String,
    },

    /// Invalid endpoint URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Invalid UUID format
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    /// Invalid server version string
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Manager is unreachable or returned a server error
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Failed to parse a manager response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Specialized result type for policy-manager client operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ExclusiveArguments(_) => "EXCLUSIVE_ARGUMENTS",
            Self::UnresolvedPlaceholder { .. } => "UNRESOLVED_PLACEHOLDER",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::InvalidUuid(_) => "INVALID_UUID",
            Self::InvalidVersion(_) => "INVALID_VERSION",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::ParseError(_) => "PARSE_ERROR",
        }
    }

    /// Returns true if this error indicates a caller-side programming mistake.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_)
                | Self::ExclusiveArguments(_)
                | Self::UnresolvedPlaceholder { .. }
                | Self::InvalidEndpoint(_)
        )
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Self {
        Self::InvalidUuid(err.to_string())
    }
}
