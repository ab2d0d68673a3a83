//! Dispatch configuration and hosting-environment context.
//!
//! [`DispatchConfig`] holds the knobs of the dispatch path. [`LogContext`]
//! carries the environment values stamped onto every message log record.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tenantq_authn::{
    HttpKeySetFetcher, KeySetCache, KeySetStore, MemoryKeySetStore, TtlKeySetStore,
    key_set_cache::KeySetFetchError,
};
use thiserror::Error;

/// Default logical service name.
pub const DEFAULT_SERVICE_NAME: &str = "order";

/// Default value of the `message_version` attribute.
pub const DEFAULT_MESSAGE_VERSION: &str = "Version 1.0";

/// Default key-set fetch timeout (10 seconds).
pub const DEFAULT_KEY_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Invalid configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A field failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the dispatch path.
///
/// # Example
///
/// ```
/// use tenantq_dispatch::DispatchConfig;
///
/// let config = DispatchConfig::builder()
///     .account_id("123456789012")
///     .build()?;
/// assert_eq!(config.service_name(), "order");
/// assert_eq!(config.message_version(), "Version 1.0");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Logical service name used in assignment lookups.
    #[serde(default = "default_service_name")]
    pub(crate) service_name: String,

    /// Account owning the tenants' identity pools.
    pub(crate) account_id: String,

    /// Value of the `message_version` attribute on every send.
    #[serde(default = "default_message_version")]
    pub(crate) message_version: String,

    /// Lifetime of cached key sets; `None` keeps them for the process lifetime.
    #[serde(with = "humantime_serde", default)]
    pub(crate) key_set_ttl: Option<Duration>,

    /// Timeout for key-set HTTP fetches.
    #[serde(with = "humantime_serde", default = "default_key_fetch_timeout")]
    pub(crate) key_fetch_timeout: Duration,
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_owned()
}

fn default_message_version() -> String {
    DEFAULT_MESSAGE_VERSION.to_owned()
}

fn default_key_fetch_timeout() -> Duration {
    DEFAULT_KEY_FETCH_TIMEOUT
}

#[bon::bon]
impl DispatchConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the service name, account id or
    /// message version is empty, the account id is not numeric, or a
    /// duration is zero.
    #[builder]
    pub fn new(
        #[builder(into, default = DEFAULT_SERVICE_NAME.to_owned())] service_name: String,
        #[builder(into)] account_id: String,
        #[builder(into, default = DEFAULT_MESSAGE_VERSION.to_owned())] message_version: String,
        key_set_ttl: Option<Duration>,
        #[builder(default = DEFAULT_KEY_FETCH_TIMEOUT)] key_fetch_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let config =
            Self { service_name, account_id, message_version, key_set_ttl, key_fetch_timeout };
        config.validate()?;
        Ok(config)
    }

    /// Checks field invariants; used after deserialization.
    ///
    /// # Errors
    ///
    /// See [`DispatchConfig::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() || self.service_name.contains('/') {
            return Err(ConfigError::Invalid(
                "service_name must be a non-empty path segment".into(),
            ));
        }
        if self.account_id.is_empty() || !self.account_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::Invalid("account_id must be a numeric account id".into()));
        }
        if self.message_version.is_empty() {
            return Err(ConfigError::Invalid("message_version cannot be empty".into()));
        }
        if self.key_set_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(ConfigError::Invalid("key_set_ttl must be positive when set".into()));
        }
        if self.key_fetch_timeout.is_zero() {
            return Err(ConfigError::Invalid("key_fetch_timeout must be positive".into()));
        }
        Ok(())
    }

    /// Logical service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Account id.
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Message version attribute value.
    #[must_use]
    pub fn message_version(&self) -> &str {
        &self.message_version
    }

    /// Key-set lifetime, if bounded.
    #[must_use]
    pub fn key_set_ttl(&self) -> Option<Duration> {
        self.key_set_ttl
    }

    /// Key-set fetch timeout.
    #[must_use]
    pub fn key_fetch_timeout(&self) -> Duration {
        self.key_fetch_timeout
    }

    /// Builds the HTTP-backed key cache described by this configuration.
    ///
    /// Without `key_set_ttl`, key sets are kept for the process lifetime.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn key_set_cache(&self) -> Result<KeySetCache, KeySetFetchError> {
        let store: Arc<dyn KeySetStore> = match self.key_set_ttl {
            Some(ttl) => Arc::new(TtlKeySetStore::new(ttl)),
            None => Arc::new(MemoryKeySetStore::new()),
        };
        let fetcher = HttpKeySetFetcher::new(self.key_fetch_timeout)?;
        Ok(KeySetCache::new(store, Arc::new(fetcher)))
    }
}

/// Extracts the account id (fifth `:` field) from an invoked-function ARN.
///
/// ```
/// use tenantq_dispatch::config::account_id_from_arn;
///
/// assert_eq!(
///     account_id_from_arn("arn:aws:lambda:us-west-2:123456789012:function:send"),
///     Some("123456789012")
/// );
/// assert_eq!(account_id_from_arn("not-an-arn"), None);
/// ```
#[must_use]
pub fn account_id_from_arn(arn: &str) -> Option<&str> {
    arn.split(':').nth(4).filter(|id| !id.is_empty())
}

/// Hosting-environment values stamped onto log records.
#[derive(Debug, Clone, Default, PartialEq, Eq, bon::Builder)]
pub struct LogContext {
    /// Deployment environment name.
    #[builder(into, default)]
    pub environment: String,
    /// Metric namespace.
    #[builder(into, default)]
    pub namespace: String,
    /// Function name.
    #[builder(into, default)]
    pub function_name: String,
    /// Function version.
    #[builder(into, default)]
    pub function_version: String,
    /// Region.
    #[builder(into, default)]
    pub region: String,
}

impl LogContext {
    /// Reads `ENVIRONMENT`, `NAMESPACE`, `AWS_LAMBDA_FUNCTION_NAME`,
    /// `AWS_LAMBDA_FUNCTION_VERSION` and `AWS_REGION`; unset variables are
    /// empty strings.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a context from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).unwrap_or_default();
        Self {
            environment: var("ENVIRONMENT"),
            namespace: var("NAMESPACE"),
            function_name: var("AWS_LAMBDA_FUNCTION_NAME"),
            function_version: var("AWS_LAMBDA_FUNCTION_VERSION"),
            region: var("AWS_REGION"),
        }
    }
}
