//! Authentication error types.
//!
//! Every failure the token verifier can produce is a variant of [`AuthError`].
//! All of them are request-scoped: they reject the current request and never
//! affect the process.

use thiserror::Error;

/// Authentication errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No bearer credential in the request headers.
    #[error("Missing bearer credential in Authorization header")]
    MissingCredential,

    /// The token (or one of its segments) cannot be decoded.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// A claim required for routing is absent or empty.
    #[error("Missing claim: {0}")]
    MissingClaim(String),

    /// A claim is present but its value cannot be interpreted.
    #[error("Invalid claim {claim}: {reason}")]
    InvalidClaim {
        /// Claim name.
        claim: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The `alg` header is forbidden or not supported.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The issuer's signing-key set could not be fetched or parsed.
    #[error("Signing key set unavailable from {url}: {message}")]
    KeySetUnavailable {
        /// Key-set URL derived from the issuer.
        url: String,
        /// Failure description.
        message: String,
    },

    /// No key in the issuer's key set matches the token's key id.
    #[error("Unknown signing key: {kid}")]
    UnknownSigningKey {
        /// Key id from the token header.
        kid: String,
    },

    /// Signature could not be decoded or did not verify.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// The `exp` claim is in the past.
    #[error("Token expired")]
    TokenExpired,
}

impl AuthError {
    /// Creates a [`AuthError::MissingCredential`].
    #[must_use]
    pub fn missing_credential() -> Self {
        Self::MissingCredential
    }

    /// Creates a [`AuthError::MalformedToken`].
    #[must_use]
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken(message.into())
    }

    /// Creates a [`AuthError::MissingClaim`].
    #[must_use]
    pub fn missing_claim(claim: impl Into<String>) -> Self {
        Self::MissingClaim(claim.into())
    }

    /// Creates a [`AuthError::InvalidClaim`].
    #[must_use]
    pub fn invalid_claim(claim: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidClaim { claim: claim.into(), reason: reason.into() }
    }

    /// Creates a [`AuthError::UnsupportedAlgorithm`].
    #[must_use]
    pub fn unsupported_algorithm(message: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm(message.into())
    }

    /// Creates a [`AuthError::KeySetUnavailable`].
    #[must_use]
    pub fn key_set_unavailable(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::KeySetUnavailable { url: url.into(), message: message.into() }
    }

    /// Creates a [`AuthError::UnknownSigningKey`].
    #[must_use]
    pub fn unknown_signing_key(kid: impl Into<String>) -> Self {
        Self::UnknownSigningKey { kid: kid.into() }
    }

    /// Creates a [`AuthError::SignatureInvalid`].
    #[must_use]
    pub fn signature_invalid() -> Self {
        Self::SignatureInvalid
    }

    /// Creates a [`AuthError::TokenExpired`].
    #[must_use]
    pub fn token_expired() -> Self {
        Self::TokenExpired
    }

    /// Short machine-readable name of the failing check, used as a log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedToken(_) => "malformed_token",
            Self::MissingClaim(_) => "missing_claim",
            Self::InvalidClaim { .. } => "invalid_claim",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::KeySetUnavailable { .. } => "key_set_unavailable",
            Self::UnknownSigningKey { .. } => "unknown_signing_key",
            Self::SignatureInvalid => "signature_invalid",
            Self::TokenExpired => "token_expired",
        }
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
