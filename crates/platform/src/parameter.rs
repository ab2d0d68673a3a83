//! External key-value configuration store.

use async_trait::async_trait;

use crate::error::PlatformResult;

/// Read-only access to hierarchical configuration parameters.
///
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Returns the value stored at `path`, or `None` if no such parameter
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns a [`PlatformError`](crate::PlatformError) only when the store
    /// cannot be queried; absence is `Ok(None)`.
    async fn get_parameter(&self, path: &str) -> PlatformResult<Option<String>>;
}

#[async_trait]
impl<P: ParameterStore + ?Sized> ParameterStore for std::sync::Arc<P> {
    async fn get_parameter(&self, path: &str) -> PlatformResult<Option<String>> {
        (**self).get_parameter(path).await
    }
}
