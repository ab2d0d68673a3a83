//! SQS backend.
//!
//! Depth queries run on the service's own client. Sends never do: each send
//! builds a one-off client whose only credentials are the tenant-scoped ones
//! passed in, so a failed exchange can never turn into an ambient send.

use std::time::SystemTime;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_sqs::{
    config::{Credentials, Region},
    types::{MessageAttributeValue, QueueAttributeName},
};
use tenantq_platform::{
    MessageAttribute, PlatformError, PlatformResult, QueueService, QueueTarget, ScopedCredentials,
};

use crate::error::sdk_error_to_platform_error;

const SCOPED_PROVIDER_NAME: &str = "tenantq-scoped";

/// [`QueueService`] backed by SQS.
#[derive(Debug, Clone)]
pub struct SqsQueueService {
    client: aws_sdk_sqs::Client,
}

impl SqsQueueService {
    /// Wraps an existing client used for depth queries.
    #[must_use]
    pub fn new(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }

    /// Creates the depth-query client from shared SDK configuration.
    #[must_use]
    pub fn from_config(config: &SdkConfig) -> Self {
        Self::new(aws_sdk_sqs::Client::new(config))
    }
}

/// Builds an SQS client that can only act as the scoped identity.
pub(crate) fn scoped_client(credentials: &ScopedCredentials) -> aws_sdk_sqs::Client {
    let provider = Credentials::new(
        credentials.access_key_id(),
        credentials.secret_access_key(),
        Some(credentials.session_token().to_owned()),
        credentials.expiration().map(SystemTime::from),
        SCOPED_PROVIDER_NAME,
    );
    let config = aws_sdk_sqs::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(credentials.region().to_owned()))
        .credentials_provider(provider)
        .build();
    aws_sdk_sqs::Client::from_conf(config)
}

#[async_trait]
impl QueueService for SqsQueueService {
    #[tracing::instrument(skip(self), fields(queue = %queue.name()))]
    async fn approximate_depth(&self, queue: &QueueTarget) -> PlatformResult<u64> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(queue.as_str())
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
            .map_err(|e| sdk_error_to_platform_error("GetQueueAttributes", &e))?;

        let raw = output
            .attributes()
            .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
            .ok_or_else(|| {
                PlatformError::serialization(
                    "GetQueueAttributes: ApproximateNumberOfMessages missing",
                )
            })?;

        raw.parse::<u64>().map_err(|e| {
            PlatformError::serialization(format!(
                "GetQueueAttributes: ApproximateNumberOfMessages '{raw}' is not a count: {e}"
            ))
        })
    }

    #[tracing::instrument(skip(self, credentials, body, attributes), fields(queue = %queue.name()))]
    async fn send(
        &self,
        queue: &QueueTarget,
        credentials: &ScopedCredentials,
        body: &str,
        attributes: &[MessageAttribute],
    ) -> PlatformResult<String> {
        let client = scoped_client(credentials);

        let mut request = client.send_message().queue_url(queue.as_str()).message_body(body);
        for attribute in attributes {
            let value = MessageAttributeValue::builder()
                .data_type("String")
                .string_value(&attribute.value)
                .build()
                .map_err(|e| PlatformError::internal_with_source("invalid message attribute", e))?;
            request = request.message_attributes(&attribute.name, value);
        }

        let output =
            request.send().await.map_err(|e| sdk_error_to_platform_error("SendMessage", &e))?;

        output
            .message_id()
            .map(str::to_owned)
            .ok_or_else(|| PlatformError::serialization("SendMessage: response has no message id"))
    }
}
