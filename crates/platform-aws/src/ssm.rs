//! SSM Parameter Store backend.

use async_trait::async_trait;
use aws_config::SdkConfig;
use tenantq_platform::{ParameterStore, PlatformResult};

use crate::error::sdk_error_to_platform_error;

/// [`ParameterStore`] backed by SSM `GetParameter`.
#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    /// Wraps an existing client.
    #[must_use]
    pub fn new(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }

    /// Creates a client from shared SDK configuration.
    #[must_use]
    pub fn from_config(config: &SdkConfig) -> Self {
        Self::new(aws_sdk_ssm::Client::new(config))
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    #[tracing::instrument(skip(self))]
    async fn get_parameter(&self, path: &str) -> PlatformResult<Option<String>> {
        match self.client.get_parameter().name(path).send().await {
            Ok(output) => Ok(output.parameter().and_then(|p| p.value()).map(str::to_owned)),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_parameter_not_found()) => {
                tracing::debug!("parameter not found");
                Ok(None)
            },
            Err(err) => Err(sdk_error_to_platform_error("GetParameter", &err)),
        }
    }
}
