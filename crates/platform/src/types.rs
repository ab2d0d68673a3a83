//! Common types shared by the collaborator traits.

use std::fmt;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

/// A single addressable queue (URL or ARN-like identifier).
///
/// # Examples
///
/// ```
/// use tenantq_platform::QueueTarget;
///
/// let queue = QueueTarget::new("https://sqs.us-west-2.amazonaws.com/123456789012/orders-pool-1");
/// assert_eq!(queue.name(), "orders-pool-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueTarget(String);

impl QueueTarget {
    /// Wraps a queue identifier.
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }

    /// The full identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short queue name: the last `/`-separated segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for QueueTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueueTarget {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for QueueTarget {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A string-typed message attribute attached on send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAttribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: String,
}

impl MessageAttribute {
    /// Creates a string attribute.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Short-lived credentials scoped to one tenant's federated identity.
///
/// Owned by a single dispatch; never logged. `Debug` redacts the secret and
/// session token, which are zeroed on drop.
#[derive(Clone)]
pub struct ScopedCredentials {
    access_key_id: String,
    secret_access_key: Zeroizing<String>,
    session_token: Zeroizing<String>,
    region: String,
    expiration: Option<DateTime<Utc>>,
}

impl ScopedCredentials {
    /// Creates scoped credentials.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: Zeroizing::new(secret_access_key.into()),
            session_token: Zeroizing::new(session_token.into()),
            region: region.into(),
            expiration: None,
        }
    }

    /// Sets the expiry reported by the identity service.
    #[must_use]
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Access key id.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Secret access key.
    #[must_use]
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Session token.
    #[must_use]
    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    /// Region the credentials were issued for.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Expiry, when known.
    #[must_use]
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }
}

impl fmt::Debug for ScopedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("region", &self.region)
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Inputs to a federated-identity exchange.
#[derive(Clone)]
pub struct FederatedLogin {
    /// Login provider name: the token issuer without its URL scheme.
    pub provider: String,
    /// Verified identity token.
    pub token: Zeroizing<String>,
    /// Identity pool id (`region:uuid`).
    pub identity_pool_id: String,
    /// Region parsed from the pool id.
    pub region: String,
    /// Account that owns the identity pool.
    pub account_id: String,
}

impl fmt::Debug for FederatedLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederatedLogin")
            .field("provider", &self.provider)
            .field("token", &"[REDACTED]")
            .field("identity_pool_id", &self.identity_pool_id)
            .field("region", &self.region)
            .field("account_id", &self.account_id)
            .finish()
    }
}
