//! Platform error types and result alias.
//!
//! Every collaborator backend maps its internal errors to [`PlatformError`].
//! Absence is not an error: a parameter that does not exist is `Ok(None)`.
//!
//! # Error Types
//!
//! - [`PlatformError::Connection`] - Network or endpoint failures
//! - [`PlatformError::Timeout`] - Call exceeded its time limit
//! - [`PlatformError::Rejected`] - The service refused the call (permissions, unknown queue)
//! - [`PlatformError::Serialization`] - Response could not be interpreted
//! - [`PlatformError::Internal`] - Anything else
//!
//! # Example
//!
//! ```
//! use tenantq_platform::{PlatformError, PlatformResult};
//!
//! fn depth(queue: &str) -> PlatformResult<u64> {
//!     Err(PlatformError::rejected(format!("access denied for {queue}")))
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors returned by collaborator backends.
///
/// # Non-exhaustive
///
/// New variants may be added in minor releases. Match with a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlatformError {
    /// Connection or network error.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// Operation timed out.
    #[error("Operation timeout")]
    Timeout,

    /// The service refused the request.
    ///
    /// Raised for authorization failures under scoped credentials and for
    /// addressing a queue that does not exist.
    #[error("Request rejected: {message}")]
    Rejected {
        /// Description of the rejection.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// A response could not be decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the decoding failure.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// Backend-specific internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },
}

impl PlatformError {
    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a source.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Creates a new `Rejected` error.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected { message: message.into(), source: None }
    }

    /// Creates a new `Rejected` error with a source.
    #[must_use]
    pub fn rejected_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Rejected { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with a source.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Short machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Timeout => "timeout",
            Self::Rejected { .. } => "rejected",
            Self::Serialization { .. } => "serialization",
            Self::Internal { .. } => "internal",
        }
    }
}
