//! Tenant-scoped message dispatch.
//!
//! [`ScopedDispatcher::dispatch`] resolves the tenant's candidate queues,
//! picks the least-loaded one, exchanges the verified token for credentials
//! scoped to the tenant's federated identity, and sends under exactly those
//! credentials.
//!
//! Dispatch is not idempotent. Nothing is rolled back when a later step
//! fails: exchanged credentials simply expire, and a caller that retries
//! after a timeout may deliver the message twice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tenantq_authn::IdentityClaims;
use tenantq_platform::{
    FederatedLogin, IdentityExchange, MessageAttribute, ParameterStore, QueueService,
    QueueTarget, Zeroizing,
};

use crate::{
    config::DEFAULT_MESSAGE_VERSION,
    error::{DispatchError, Result},
    log::{MESSAGE_COUNT_METRIC, MessageLogRecord, SEND_OPERATION},
    resolver::TenantQueueResolver,
    selector::LoadAwareSelector,
};

/// Message attribute carrying the tenant id.
pub const TENANT_ID_ATTRIBUTE: &str = "tenant_id";

/// Message attribute carrying the message schema version.
pub const MESSAGE_VERSION_ATTRIBUTE: &str = "message_version";

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// Queue the message was sent to.
    pub queue: QueueTarget,
    /// Provider-assigned message id.
    pub message_id: String,
    /// Tenant the message was sent for.
    pub tenant_id: String,
    /// When the send completed.
    pub timestamp: DateTime<Utc>,
}

impl DispatchResult {
    /// The `send_message` log record for this dispatch.
    #[must_use]
    pub fn log_record(&self, request_id: Option<&str>) -> MessageLogRecord {
        MessageLogRecord::builder()
            .timestamp(self.timestamp)
            .operation(SEND_OPERATION)
            .message_id(self.message_id.as_str())
            .tenant_id(self.tenant_id.as_str())
            .queue(self.queue.name())
            .maybe_request_id(request_id)
            .metrics(vec![MESSAGE_COUNT_METRIC.to_owned()])
            .dimensions(vec!["operation".to_owned(), "tenantId".to_owned()])
            .build()
    }
}

/// Sends messages on behalf of verified tenants.
#[derive(Clone)]
pub struct ScopedDispatcher {
    resolver: TenantQueueResolver,
    selector: LoadAwareSelector,
    queues: Arc<dyn QueueService>,
    identity: Arc<dyn IdentityExchange>,
    message_version: String,
}

#[bon::bon]
impl ScopedDispatcher {
    /// Creates a dispatcher over the given collaborators.
    ///
    /// `queues` serves both depth queries (ambient identity) and sends
    /// (scoped identity).
    #[builder]
    pub fn new(
        parameters: Arc<dyn ParameterStore>,
        queues: Arc<dyn QueueService>,
        identity: Arc<dyn IdentityExchange>,
        #[builder(into, default = DEFAULT_MESSAGE_VERSION.to_owned())] message_version: String,
    ) -> Self {
        Self {
            resolver: TenantQueueResolver::new(parameters),
            selector: LoadAwareSelector::new(Arc::clone(&queues)),
            queues,
            identity,
            message_version,
        }
    }

    /// Sends `body` to the tenant's least-loaded queue under tenant-scoped
    /// credentials.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Auth`] if the claims lack a tenant id or a valid
    ///   identity-pool reference.
    /// - Resolver and selector errors, unchanged.
    /// - [`DispatchError::CredentialExchangeFailed`] if the exchange is
    ///   refused. No other credentials are tried.
    /// - [`DispatchError::DispatchFailed`] if the send is rejected. The send
    ///   is not retried.
    #[tracing::instrument(
        skip(self, raw_token, claims, body),
        fields(tenant_id = tracing::field::Empty, queue = tracing::field::Empty)
    )]
    pub async fn dispatch(
        &self,
        raw_token: &str,
        claims: &IdentityClaims,
        account_id: &str,
        service_name: &str,
        body: &str,
    ) -> Result<DispatchResult> {
        let tenant_id = claims.require_tenant_id()?;
        let span = tracing::Span::current();
        span.record("tenant_id", tenant_id);

        let candidates = self.resolver.resolve(tenant_id, service_name).await?;
        let queue = self.selector.select(&candidates).await?;
        span.record("queue", queue.name());

        let pool = claims.identity_pool()?;
        let login = FederatedLogin {
            provider: claims.login_provider().to_owned(),
            token: Zeroizing::new(raw_token.to_owned()),
            identity_pool_id: pool.pool_id,
            region: pool.region,
            account_id: account_id.to_owned(),
        };
        let credentials = self.identity.exchange(&login).await.map_err(|source| {
            tracing::warn!(error = %source, "credential exchange refused");
            DispatchError::credential_exchange_failed(tenant_id, source)
        })?;

        let attributes = [
            MessageAttribute::string(TENANT_ID_ATTRIBUTE, tenant_id),
            MessageAttribute::string(MESSAGE_VERSION_ATTRIBUTE, self.message_version.as_str()),
        ];
        let message_id = self
            .queues
            .send(&queue, &credentials, body, &attributes)
            .await
            .map_err(|source| {
                tracing::warn!(error = %source, "send rejected");
                DispatchError::dispatch_failed(queue.as_str(), source)
            })?;

        tracing::debug!(%message_id, "message sent");
        Ok(DispatchResult {
            queue,
            message_id,
            tenant_id: tenant_id.to_owned(),
            timestamp: Utc::now(),
        })
    }
}
