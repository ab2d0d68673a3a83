//! Cognito Identity backend.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cognitoidentity::config::Region;
use chrono::DateTime;
use parking_lot::RwLock;
use tenantq_platform::{
    FederatedLogin, IdentityExchange, PlatformError, PlatformResult, ScopedCredentials,
};

use crate::error::sdk_error_to_platform_error;

/// [`IdentityExchange`] backed by Cognito `GetId` and
/// `GetCredentialsForIdentity`.
///
/// Calls go to the region encoded in the identity pool id; one client is
/// kept per region.
#[derive(Debug)]
pub struct CognitoIdentityExchange {
    base: SdkConfig,
    clients: RwLock<HashMap<String, aws_sdk_cognitoidentity::Client>>,
}

impl CognitoIdentityExchange {
    /// Creates an exchange deriving its per-region clients from `base`.
    #[must_use]
    pub fn new(base: SdkConfig) -> Self {
        Self { base, clients: RwLock::new(HashMap::new()) }
    }

    fn client_for(&self, region: &str) -> aws_sdk_cognitoidentity::Client {
        if let Some(client) = self.clients.read().get(region) {
            return client.clone();
        }
        let config = aws_sdk_cognitoidentity::config::Builder::from(&self.base)
            .region(Region::new(region.to_owned()))
            .build();
        let client = aws_sdk_cognitoidentity::Client::from_conf(config);
        self.clients.write().insert(region.to_owned(), client.clone());
        client
    }
}

#[async_trait]
impl IdentityExchange for CognitoIdentityExchange {
    #[tracing::instrument(
        skip(self, login),
        fields(provider = %login.provider, identity_pool = %login.identity_pool_id)
    )]
    async fn exchange(&self, login: &FederatedLogin) -> PlatformResult<ScopedCredentials> {
        let client = self.client_for(&login.region);

        let identity = client
            .get_id()
            .account_id(&login.account_id)
            .identity_pool_id(&login.identity_pool_id)
            .logins(&login.provider, login.token.as_str())
            .send()
            .await
            .map_err(|e| sdk_error_to_platform_error("GetId", &e))?;
        let identity_id = identity
            .identity_id()
            .ok_or_else(|| PlatformError::serialization("GetId: response has no identity id"))?;

        let output = client
            .get_credentials_for_identity()
            .identity_id(identity_id)
            .logins(&login.provider, login.token.as_str())
            .send()
            .await
            .map_err(|e| sdk_error_to_platform_error("GetCredentialsForIdentity", &e))?;

        let credentials = output.credentials().ok_or_else(|| {
            PlatformError::serialization("GetCredentialsForIdentity: response has no credentials")
        })?;
        let missing = |field: &str| {
            PlatformError::serialization(format!("GetCredentialsForIdentity: missing {field}"))
        };

        let mut scoped = ScopedCredentials::new(
            credentials.access_key_id().ok_or_else(|| missing("access key id"))?,
            credentials.secret_key().ok_or_else(|| missing("secret key"))?,
            credentials.session_token().ok_or_else(|| missing("session token"))?,
            login.region.as_str(),
        );
        if let Some(expiration) = credentials.expiration()
            && let Some(expiration) = DateTime::from_timestamp(expiration.secs(), 0)
        {
            scoped = scoped.with_expiration(expiration);
        }

        tracing::debug!(identity_id, "exchanged token for scoped credentials");
        Ok(scoped)
    }
}
