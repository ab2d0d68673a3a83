//! Managed queue system.

use async_trait::async_trait;

use crate::{
    error::PlatformResult,
    types::{MessageAttribute, QueueTarget, ScopedCredentials},
};

/// Queries and sends against an external managed queue service.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Approximate number of messages waiting in `queue`.
    ///
    /// Read with the service's own credentials; this is an operator-level
    /// query, not a tenant action.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute cannot be read.
    async fn approximate_depth(&self, queue: &QueueTarget) -> PlatformResult<u64>;

    /// Sends `body` to `queue` under `credentials` and returns the
    /// provider-assigned message id.
    ///
    /// Implementations must use exactly `credentials` for the call and never
    /// fall back to ambient credentials.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Rejected`](crate::PlatformError::Rejected)
    /// when the scoped identity may not send to `queue`.
    async fn send(
        &self,
        queue: &QueueTarget,
        credentials: &ScopedCredentials,
        body: &str,
        attributes: &[MessageAttribute],
    ) -> PlatformResult<String>;
}

#[async_trait]
impl<Q: QueueService + ?Sized> QueueService for std::sync::Arc<Q> {
    async fn approximate_depth(&self, queue: &QueueTarget) -> PlatformResult<u64> {
        (**self).approximate_depth(queue).await
    }

    async fn send(
        &self,
        queue: &QueueTarget,
        credentials: &ScopedCredentials,
        body: &str,
        attributes: &[MessageAttribute],
    ) -> PlatformResult<String> {
        (**self).send(queue, credentials, body, attributes).await
    }
}
