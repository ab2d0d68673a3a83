//! Federated-identity exchange.

use async_trait::async_trait;

use crate::{
    error::PlatformResult,
    types::{FederatedLogin, ScopedCredentials},
};

/// Trades a verified identity token for tenant-scoped credentials.
#[async_trait]
pub trait IdentityExchange: Send + Sync {
    /// Exchanges `login` for short-lived credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity service refuses the login or is
    /// unreachable. Callers must treat any error as final and must not
    /// substitute other credentials.
    async fn exchange(&self, login: &FederatedLogin) -> PlatformResult<ScopedCredentials>;
}

#[async_trait]
impl<I: IdentityExchange + ?Sized> IdentityExchange for std::sync::Arc<I> {
    async fn exchange(&self, login: &FederatedLogin) -> PlatformResult<ScopedCredentials> {
        (**self).exchange(login).await
    }
}
