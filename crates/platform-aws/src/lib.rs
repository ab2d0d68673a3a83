//! AWS implementations of the tenantq platform traits.
//!
//! | Trait | Backend |
//! |-------|---------|
//! | [`ParameterStore`](tenantq_platform::ParameterStore) | [`SsmParameterStore`] |
//! | [`QueueService`](tenantq_platform::QueueService) | [`SqsQueueService`] |
//! | [`IdentityExchange`](tenantq_platform::IdentityExchange) | [`CognitoIdentityExchange`] |
//!
//! # Quick Start
//!
//! ```no_run
//! // Requires AWS credentials in the environment.
//! use tenantq_platform_aws::AwsPlatform;
//!
//! # async fn example() {
//! let platform = AwsPlatform::load().await;
//! # let _ = platform;
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Cognito Identity exchange.
pub mod cognito;
mod error;
/// SQS queue service.
pub mod sqs;
/// SSM parameter store.
pub mod ssm;

use std::sync::Arc;

use aws_config::BehaviorVersion;
pub use cognito::CognitoIdentityExchange;
pub use sqs::SqsQueueService;
pub use ssm::SsmParameterStore;

/// The three AWS collaborators built from one shared configuration.
#[derive(Debug, Clone)]
pub struct AwsPlatform {
    /// Parameter store.
    pub parameters: Arc<SsmParameterStore>,
    /// Queue service.
    pub queues: Arc<SqsQueueService>,
    /// Identity exchange.
    pub identity: Arc<CognitoIdentityExchange>,
}

impl AwsPlatform {
    /// Loads the ambient AWS configuration (environment, profile, instance
    /// role) and builds all three backends from it.
    pub async fn load() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        tracing::info!(
            region = config.region().map(|r| r.as_ref()).unwrap_or_default(),
            "loaded AWS configuration"
        );
        Self {
            parameters: Arc::new(SsmParameterStore::from_config(&config)),
            queues: Arc::new(SqsQueueService::from_config(&config)),
            identity: Arc::new(CognitoIdentityExchange::new(config)),
        }
    }
}
