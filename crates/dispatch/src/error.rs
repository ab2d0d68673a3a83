//! Dispatch error taxonomy and the caller-facing outcome table.
//!
//! Every failure on the dispatch path is a [`DispatchError`]. All of them are
//! request-scoped: they abort the current request and nothing else. The
//! request boundary turns them into responses through [`outcome_for`], the
//! single place where variants meet status codes.

use std::fmt;

use tenantq_authn::AuthError;
use tenantq_platform::PlatformError;
use thiserror::Error;

/// Which lookup of the two-level queue assignment failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStage {
    /// `/{service}/queue/{tenant}`.
    Assignment,
    /// Second-level lookup of a pool's queue list.
    Pool,
}

impl fmt::Display for LookupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assignment => write!(f, "queue assignment"),
            Self::Pool => write!(f, "queue pool"),
        }
    }
}

/// Errors on the dispatch path.
///
/// # Non-exhaustive
///
/// New variants may be added in minor releases. Match with a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    /// Token verification failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The request body is unusable.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No configuration parameter at `key`.
    #[error("No {stage} parameter found at {key}")]
    ConfigNotFound {
        /// Lookup key.
        key: String,
        /// Which lookup failed.
        stage: LookupStage,
    },

    /// The configuration store could not be queried.
    #[error("Configuration store unavailable for {key}: {source}")]
    ConfigUnavailable {
        /// Lookup key.
        key: String,
        /// Underlying failure.
        #[source]
        source: PlatformError,
    },

    /// A candidate queue's depth could not be read.
    #[error("Queue attributes unavailable for {queue}: {source}")]
    QueueAttributesUnavailable {
        /// Queue whose attributes failed.
        queue: String,
        /// Underlying failure.
        #[source]
        source: PlatformError,
    },

    /// The federated-identity exchange refused or failed.
    #[error("Credential exchange failed for tenant {tenant_id}: {source}")]
    CredentialExchangeFailed {
        /// Tenant the exchange was for.
        tenant_id: String,
        /// Underlying failure.
        #[source]
        source: PlatformError,
    },

    /// The queue rejected or failed the send.
    #[error("Dispatch to {queue} failed: {source}")]
    DispatchFailed {
        /// Target queue.
        queue: String,
        /// Underlying failure.
        #[source]
        source: PlatformError,
    },
}

impl DispatchError {
    /// Creates a [`DispatchError::InvalidRequest`].
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Creates a [`DispatchError::ConfigNotFound`].
    #[must_use]
    pub fn config_not_found(key: impl Into<String>, stage: LookupStage) -> Self {
        Self::ConfigNotFound { key: key.into(), stage }
    }

    /// Creates a [`DispatchError::ConfigUnavailable`].
    #[must_use]
    pub fn config_unavailable(key: impl Into<String>, source: PlatformError) -> Self {
        Self::ConfigUnavailable { key: key.into(), source }
    }

    /// Creates a [`DispatchError::QueueAttributesUnavailable`].
    #[must_use]
    pub fn queue_attributes_unavailable(queue: impl Into<String>, source: PlatformError) -> Self {
        Self::QueueAttributesUnavailable { queue: queue.into(), source }
    }

    /// Creates a [`DispatchError::CredentialExchangeFailed`].
    #[must_use]
    pub fn credential_exchange_failed(tenant_id: impl Into<String>, source: PlatformError) -> Self {
        Self::CredentialExchangeFailed { tenant_id: tenant_id.into(), source }
    }

    /// Creates a [`DispatchError::DispatchFailed`].
    #[must_use]
    pub fn dispatch_failed(queue: impl Into<String>, source: PlatformError) -> Self {
        Self::DispatchFailed { queue: queue.into(), source }
    }

    /// The failing step, used as a log field.
    #[must_use]
    pub fn step(&self) -> &'static str {
        match self {
            Self::Auth(_) => "verify",
            Self::InvalidRequest(_) => "request",
            Self::ConfigNotFound { .. } | Self::ConfigUnavailable { .. } => "resolve",
            Self::QueueAttributesUnavailable { .. } => "select",
            Self::CredentialExchangeFailed { .. } => "exchange",
            Self::DispatchFailed { .. } => "send",
        }
    }

    /// Caller-facing class of this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        outcome_for(self).class
    }
}

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Coarse caller-facing classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller's identity could not be established.
    Authentication,
    /// The request itself is unusable.
    InvalidRequest,
    /// The tenant's queue could not be determined.
    Routing,
    /// The message could not be delivered.
    Delivery,
}

impl ErrorClass {
    /// Lower-case name used in response bodies.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::InvalidRequest => "invalid_request",
            Self::Routing => "routing",
            Self::Delivery => "delivery",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class and status code for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Caller-facing class.
    pub class: ErrorClass,
    /// HTTP-style status code.
    pub status: u16,
}

impl Outcome {
    const fn new(class: ErrorClass, status: u16) -> Self {
        Self { class, status }
    }
}

/// Maps each failure to its caller-facing outcome.
///
/// | Error | Class | Status |
/// |-------|-------|--------|
/// | `Auth(KeySetUnavailable)` | Authentication | 503 |
/// | `Auth(_)` | Authentication | 401 |
/// | `InvalidRequest` | InvalidRequest | 400 |
/// | `ConfigNotFound` | Routing | 404 |
/// | `ConfigUnavailable` | Routing | 503 |
/// | `QueueAttributesUnavailable` | Routing | 503 |
/// | `CredentialExchangeFailed` | Delivery | 403 |
/// | `DispatchFailed` | Delivery | 502 |
#[must_use]
pub fn outcome_for(error: &DispatchError) -> Outcome {
    use ErrorClass::{Authentication, Delivery, InvalidRequest, Routing};

    match error {
        DispatchError::Auth(AuthError::KeySetUnavailable { .. }) => {
            Outcome::new(Authentication, 503)
        },
        DispatchError::Auth(_) => Outcome::new(Authentication, 401),
        DispatchError::InvalidRequest(_) => Outcome::new(InvalidRequest, 400),
        DispatchError::ConfigNotFound { .. } => Outcome::new(Routing, 404),
        DispatchError::ConfigUnavailable { .. } => Outcome::new(Routing, 503),
        DispatchError::QueueAttributesUnavailable { .. } => Outcome::new(Routing, 503),
        DispatchError::CredentialExchangeFailed { .. } => Outcome::new(Delivery, 403),
        DispatchError::DispatchFailed { .. } => Outcome::new(Delivery, 502),
    }
}
