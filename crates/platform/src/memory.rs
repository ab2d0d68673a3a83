//! In-memory collaborator implementations.
//!
//! [`MemoryParameterStore`], [`MemoryQueueService`] and
//! [`MemoryIdentityExchange`] back the platform traits with process-local
//! state. They are used for tests and local runs, record every call, and can
//! be told to fail specific operations.
//!
//! # Example
//!
//! ```
//! use tenantq_platform::{MemoryParameterStore, ParameterStore};
//!
//! # tokio_test_block_on(async {
//! let store = MemoryParameterStore::new();
//! store.insert("/order/queue/t1", "queueA");
//! assert_eq!(store.get_parameter("/order/queue/t1").await.unwrap().as_deref(), Some("queueA"));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::{
    error::{PlatformError, PlatformResult},
    identity::IdentityExchange,
    parameter::ParameterStore,
    queue::QueueService,
    types::{FederatedLogin, MessageAttribute, QueueTarget, ScopedCredentials},
};

/// Parameter store backed by a `HashMap`.
#[derive(Debug, Default, Clone)]
pub struct MemoryParameterStore {
    values: Arc<RwLock<HashMap<String, String>>>,
    unavailable: Arc<RwLock<HashSet<String>>>,
    reads: Arc<Mutex<Vec<String>>>,
}

impl MemoryParameterStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `path` to `value`.
    pub fn insert(&self, path: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(path.into(), value.into());
    }

    /// Makes reads of `path` fail with a connection error.
    pub fn make_unavailable(&self, path: impl Into<String>) {
        self.unavailable.write().insert(path.into());
    }

    /// Paths read so far, in order.
    #[must_use]
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().clone()
    }
}

#[async_trait]
impl ParameterStore for MemoryParameterStore {
    async fn get_parameter(&self, path: &str) -> PlatformResult<Option<String>> {
        self.reads.lock().push(path.to_owned());
        if self.unavailable.read().contains(path) {
            let message = format!("parameter store unreachable for {path}");
            return Err(PlatformError::connection(message));
        }
        Ok(self.values.read().get(path).cloned())
    }
}

/// A message accepted by [`MemoryQueueService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Assigned message id.
    pub message_id: String,
    /// Queue the message was sent to.
    pub queue: QueueTarget,
    /// Message body.
    pub body: String,
    /// Attributes attached on send.
    pub attributes: Vec<MessageAttribute>,
    /// Access key id of the credentials used for the send.
    pub sent_with: String,
}

#[derive(Debug, Default)]
struct QueueState {
    depth: u64,
    depth_unavailable: bool,
    reject_sends: bool,
}

/// Queue service with in-process queues.
///
/// Sends to an unknown queue are rejected, as a managed service would.
#[derive(Debug, Default)]
pub struct MemoryQueueService {
    queues: RwLock<HashMap<QueueTarget, QueueState>>,
    sent: Mutex<Vec<SentMessage>>,
    depth_queries: AtomicUsize,
    next_id: AtomicU64,
}

impl MemoryQueueService {
    /// Creates a service with no queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or resets) `queue` with the given backlog depth.
    pub fn add_queue(&self, queue: impl Into<QueueTarget>, depth: u64) {
        self.queues.write().insert(queue.into(), QueueState { depth, ..QueueState::default() });
    }

    /// Makes depth queries for `queue` fail.
    pub fn fail_depth_queries(&self, queue: &QueueTarget) {
        if let Some(state) = self.queues.write().get_mut(queue) {
            state.depth_unavailable = true;
        }
    }

    /// Makes sends to `queue` fail as an authorization rejection.
    pub fn reject_sends(&self, queue: &QueueTarget) {
        if let Some(state) = self.queues.write().get_mut(queue) {
            state.reject_sends = true;
        }
    }

    /// Messages accepted so far.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Number of depth queries served (including failed ones).
    #[must_use]
    pub fn depth_query_count(&self) -> usize {
        self.depth_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueService for MemoryQueueService {
    async fn approximate_depth(&self, queue: &QueueTarget) -> PlatformResult<u64> {
        self.depth_queries.fetch_add(1, Ordering::SeqCst);
        let queues = self.queues.read();
        match queues.get(queue) {
            Some(state) if state.depth_unavailable => {
                Err(PlatformError::connection(format!("attributes unavailable for {queue}")))
            },
            Some(state) => Ok(state.depth),
            None => Err(PlatformError::rejected(format!("queue does not exist: {queue}"))),
        }
    }

    async fn send(
        &self,
        queue: &QueueTarget,
        credentials: &ScopedCredentials,
        body: &str,
        attributes: &[MessageAttribute],
    ) -> PlatformResult<String> {
        let mut queues = self.queues.write();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| PlatformError::rejected(format!("queue does not exist: {queue}")))?;
        if state.reject_sends {
            return Err(PlatformError::rejected(format!(
                "{} is not authorized to send to {queue}",
                credentials.access_key_id()
            )));
        }
        state.depth += 1;

        let message_id = format!("mem-{:08}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.sent.lock().push(SentMessage {
            message_id: message_id.clone(),
            queue: queue.clone(),
            body: body.to_owned(),
            attributes: attributes.to_vec(),
            sent_with: credentials.access_key_id().to_owned(),
        });
        Ok(message_id)
    }
}

/// Identity exchange that issues synthetic credentials.
///
/// Every login is granted unless its pool has been denied.
#[derive(Debug, Default)]
pub struct MemoryIdentityExchange {
    denied_pools: RwLock<HashSet<String>>,
    logins: Mutex<Vec<FederatedLogin>>,
    issued: AtomicU64,
}

impl MemoryIdentityExchange {
    /// Creates an exchange that grants every login.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses logins for `identity_pool_id`.
    pub fn deny_pool(&self, identity_pool_id: impl Into<String>) {
        self.denied_pools.write().insert(identity_pool_id.into());
    }

    /// Logins received so far.
    #[must_use]
    pub fn logins(&self) -> Vec<FederatedLogin> {
        self.logins.lock().clone()
    }
}

#[async_trait]
impl IdentityExchange for MemoryIdentityExchange {
    async fn exchange(&self, login: &FederatedLogin) -> PlatformResult<ScopedCredentials> {
        self.logins.lock().push(login.clone());
        if self.denied_pools.read().contains(&login.identity_pool_id) {
            return Err(PlatformError::rejected(format!(
                "login from {} not permitted for pool {}",
                login.provider, login.identity_pool_id
            )));
        }

        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ScopedCredentials::new(
            format!("ASIAMEMORY{n:010}"),
            format!("memory-secret-{n}"),
            format!("memory-session-{n}"),
            login.region.clone(),
        ))
    }
}
