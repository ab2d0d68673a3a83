//! Collaborator interfaces for tenant queue dispatch.
//!
//! The dispatch path talks to three external services. Each is a trait here
//! so the core can run against the production backends in
//! `tenantq-platform-aws` or the in-memory fakes in [`memory`]:
//!
//! | Trait | Role |
//! |-------|------|
//! | [`ParameterStore`] | tenant → queue assignment lookups |
//! | [`QueueService`] | backlog depth queries and scoped sends |
//! | [`IdentityExchange`] | verified token → tenant-scoped credentials |
//!
//! # Error Handling
//!
//! All operations return [`PlatformResult<T>`]. Backends map their internal
//! errors to [`PlatformError`]; a missing parameter is `Ok(None)`.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with credential fixtures and assertion macros.

#![deny(unsafe_code)]

pub mod error;
pub mod identity;
pub mod memory;
pub mod parameter;
pub mod queue;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod types;

pub use error::{BoxError, PlatformError, PlatformResult};
pub use identity::IdentityExchange;
pub use memory::{MemoryIdentityExchange, MemoryParameterStore, MemoryQueueService, SentMessage};
pub use parameter::ParameterStore;
pub use queue::QueueService;
pub use types::{FederatedLogin, MessageAttribute, QueueTarget, ScopedCredentials};
pub use zeroize::Zeroizing;
