//! # tenantq dispatch
//!
//! Authenticated, tenant-aware message dispatch.
//!
//! A request flows through four steps:
//!
//! 1. [`TokenVerifier`](tenantq_authn::TokenVerifier) establishes the caller's identity claims.
//! 2. [`TenantQueueResolver`] reads the tenant's dedicated queue or pool from the parameter store.
//! 3. [`LoadAwareSelector`] picks the pool member with the smallest backlog.
//! 4. [`ScopedDispatcher`] exchanges the token for tenant-scoped credentials and sends.
//!
//! [`MessageHandler`] wraps the steps into a request/response boundary and
//! maps every [`DispatchError`] to a status through [`outcome_for`].
//! [`ReceiveLogger`] is the consumer-side counterpart that logs deliveries.
//!
//! ## Example
//!
//! ```no_run
//! use std::{collections::HashMap, sync::Arc};
//!
//! use tenantq_authn::TokenVerifier;
//! use tenantq_dispatch::{
//!     DispatchConfig, InboundRequest, LogContext, MessageHandler, ScopedDispatcher,
//!     TracingMessageLogger,
//! };
//! use tenantq_platform::{MemoryIdentityExchange, MemoryParameterStore, MemoryQueueService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DispatchConfig::builder().account_id("123456789012").build()?;
//! let dispatcher = ScopedDispatcher::builder()
//!     .parameters(Arc::new(MemoryParameterStore::new()))
//!     .queues(Arc::new(MemoryQueueService::new()))
//!     .identity(Arc::new(MemoryIdentityExchange::new()))
//!     .message_version(config.message_version())
//!     .build();
//! let handler = MessageHandler::builder()
//!     .verifier(TokenVerifier::new(Arc::new(config.key_set_cache()?)))
//!     .dispatcher(dispatcher)
//!     .logger(Arc::new(TracingMessageLogger::new(LogContext::from_env())))
//!     .config(config)
//!     .build();
//!
//! let request = InboundRequest {
//!     headers: HashMap::from([("Authorization".into(), "Bearer eyJ...".into())]),
//!     body: Some(r#"{"message":"hi"}"#.into()),
//!     ..InboundRequest::default()
//! };
//! let response = handler.handle(&request).await;
//! println!("{} {}", response.status, response.body);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Configuration and hosting context.
pub mod config;
/// Consumer-side receive logging.
pub mod consumer;
/// Scoped dispatch.
pub mod dispatcher;
/// Dispatch errors and the outcome table.
pub mod error;
/// Request boundary.
pub mod handler;
/// Message log records and sinks.
pub mod log;
/// Tenant queue assignment lookup.
pub mod resolver;
/// Least-loaded queue selection.
pub mod selector;

pub use config::{ConfigError, DispatchConfig, LogContext, account_id_from_arn};
pub use consumer::{QueueEvent, QueueRecord, ReceiveLogger};
pub use dispatcher::{DispatchResult, ScopedDispatcher};
pub use error::{DispatchError, ErrorClass, LookupStage, Outcome, Result, outcome_for};
pub use handler::{InboundRequest, MessageHandler, Response};
pub use log::{
    LogLevel, MemoryMessageLogger, MessageLogRecord, MessageLogger, NoopMessageLogger,
    TracingMessageLogger,
};
pub use resolver::TenantQueueResolver;
pub use selector::LoadAwareSelector;
