//! Error taxonomy for secret operations

use std::time::Duration;
use thiserror::Error;

/// Boxed underlying cause kept for diagnostics.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for secret operations
#[derive(Debug, Error)]
pub enum SecretError {
    /// A secret with this name already exists
    #[error("Secret '{name}' already exists")]
    DuplicateName {
        /// Secret name
        name: String,
    },

    /// No secret with this identifier exists
    #[error("Secret '{id}' not found")]
    NotFound {
        /// Name or ARN that was looked up
        id: String,
    },

    /// The payload could not be encoded
    #[error("Failed to serialize secret payload: {source}")]
    Serialization {
        /// Encoder error
        #[source]
        source: serde_json::Error,
    },

    /// The stored value could not be decoded
    #[error("Failed to deserialize secret '{id}': {message}")]
    Deserialization {
        /// Name or ARN of the secret
        id: String,
        /// Decoder message
        message: String,
    },

    /// Transport, authentication or throttling failure from the service
    #[error("{operation} failed: {message}")]
    Service {
        /// Operation that was being performed (e.g. `CreateSecret`)
        operation: &'static str,
        /// Human readable message
        message: String,
        /// Whether the condition is transient
        retryable: bool,
        /// Underlying cause
        #[source]
        source: Option<BoxError>,
    },

    /// Missing region, credentials or other setup problem
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Caller supplied an argument the service would reject
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message
        message: String,
    },

    /// Listing stopped part way through
    #[error("Listing incomplete after {yielded} secrets: {source}")]
    IncompleteListing {
        /// Number of secrets produced before the failure
        yielded: usize,
        /// The failure that stopped enumeration
        #[source]
        source: Box<SecretError>,
    },

    /// Operation did not finish before its deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Operation that was interrupted
        operation: &'static str,
        /// Configured deadline
        after: Duration,
    },

    /// Operation was cancelled by the caller
    #[error("{operation} was cancelled")]
    Cancelled {
        /// Operation that was interrupted
        operation: &'static str,
    },
}

/// Coarse classification of a [`SecretError`], used for exit codes and
/// machine-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`SecretError::DuplicateName`]
    DuplicateName,
    /// See [`SecretError::NotFound`]
    NotFound,
    /// See [`SecretError::Serialization`]
    Serialization,
    /// See [`SecretError::Deserialization`]
    Deserialization,
    /// See [`SecretError::Service`]
    Service,
    /// See [`SecretError::Configuration`]
    Configuration,
    /// See [`SecretError::InvalidInput`]
    InvalidInput,
    /// See [`SecretError::Timeout`]
    Timeout,
    /// See [`SecretError::Cancelled`]
    Cancelled,
}

impl ErrorKind {
    /// Stable snake_case code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateName => "duplicate_name",
            Self::NotFound => "not_found",
            Self::Serialization => "serialization",
            Self::Deserialization => "deserialization",
            Self::Service => "service",
            Self::Configuration => "configuration",
            Self::InvalidInput => "invalid_input",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SecretError {
    /// Create a service error without an underlying cause
    #[must_use]
    pub fn service(operation: &'static str, message: impl Into<String>, retryable: bool) -> Self {
        Self::Service {
            operation,
            message: message.into(),
            retryable,
            source: None,
        }
    }

    /// Create a service error that keeps its underlying cause
    #[must_use]
    pub fn service_with_source(
        operation: &'static str,
        message: impl Into<String>,
        retryable: bool,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Service {
            operation,
            message: message.into(),
            retryable,
            source: Some(source.into()),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a not found error
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Classify this error.
    ///
    /// An incomplete listing reports the kind of the failure that stopped it.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateName { .. } => ErrorKind::DuplicateName,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Deserialization { .. } => ErrorKind::Deserialization,
            Self::Service { .. } => ErrorKind::Service,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::IncompleteListing { source, .. } => source.kind(),
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Whether retrying the same call may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Service { retryable: true, .. })
    }
}
