//! Tenant queue assignment lookup.
//!
//! A tenant's assignment lives at `/{service}/queue/{tenant}`. The value is
//! either one or more whitespace-separated queue targets, or a pool name
//! ending in [`POOL_SUFFIX`]; a pool name is itself a key whose value lists
//! the pool's queues in priority order.

use std::sync::Arc;

use tenantq_platform::{ParameterStore, QueueTarget};

use crate::error::{DispatchError, LookupStage, Result};

/// Marks an assignment value as a pool reference.
pub const POOL_SUFFIX: &str = "pool";

/// Builds the assignment key for `tenant_id` under `service_name`.
#[must_use]
pub fn assignment_path(service_name: &str, tenant_id: &str) -> String {
    format!("/{service_name}/queue/{tenant_id}")
}

/// Resolves a tenant to its ordered candidate queues.
#[derive(Clone)]
pub struct TenantQueueResolver {
    store: Arc<dyn ParameterStore>,
}

impl TenantQueueResolver {
    /// Creates a resolver reading from `store`.
    pub fn new(store: Arc<dyn ParameterStore>) -> Self {
        Self { store }
    }

    /// Returns the tenant's candidate queues, never empty, in declared order.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::ConfigNotFound`] if the assignment or the pool it
    ///   names is absent or lists no queues.
    /// - [`DispatchError::ConfigUnavailable`] if the store cannot be queried.
    #[tracing::instrument(
        skip(self),
        fields(pool = tracing::field::Empty, candidates = tracing::field::Empty)
    )]
    pub async fn resolve(&self, tenant_id: &str, service_name: &str) -> Result<Vec<QueueTarget>> {
        let key = assignment_path(service_name, tenant_id);
        let assignment = self.lookup(&key, LookupStage::Assignment).await?;

        let (value, key, stage) = if assignment.ends_with(POOL_SUFFIX) {
            tracing::Span::current().record("pool", assignment.as_str());
            let pool = self.lookup(&assignment, LookupStage::Pool).await?;
            (pool, assignment, LookupStage::Pool)
        } else {
            (assignment, key, LookupStage::Assignment)
        };

        let targets: Vec<QueueTarget> = value.split_whitespace().map(QueueTarget::from).collect();
        if targets.is_empty() {
            return Err(DispatchError::config_not_found(key, stage));
        }
        tracing::Span::current().record("candidates", targets.len());
        Ok(targets)
    }

    async fn lookup(&self, key: &str, stage: LookupStage) -> Result<String> {
        match self.store.get_parameter(key).await {
            Ok(Some(value)) => Ok(value.trim().to_owned()),
            Ok(None) => {
                tracing::warn!(key, %stage, "queue configuration not found");
                Err(DispatchError::config_not_found(key, stage))
            },
            Err(source) => Err(DispatchError::config_unavailable(key, source)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use tenantq_platform::MemoryParameterStore;

    use super::*;

    fn resolver_with(entries: &[(&str, &str)]) -> (TenantQueueResolver, Arc<MemoryParameterStore>) {
        let store = Arc::new(MemoryParameterStore::new());
        for (k, v) in entries {
            store.insert(*k, *v);
        }
        (TenantQueueResolver::new(store.clone()), store)
    }

    fn names(targets: &[QueueTarget]) -> Vec<&str> {
        targets.iter().map(QueueTarget::as_str).collect()
    }

    #[tokio::test]
    async fn test_dedicated_queue() {
        let (resolver, store) = resolver_with(&[("/order/queue/t1", "queueA")]);
        let targets = resolver.resolve("t1", "order").await.unwrap();
        assert_eq!(names(&targets), vec!["queueA"]);
        assert_eq!(store.reads(), vec!["/order/queue/t1".to_owned()]);
    }

    #[tokio::test]
    async fn test_pool_indirection_preserves_order() {
        let (resolver, store) =
            resolver_with(&[("/order/queue/t1", "pool1pool"), ("pool1pool", "queueB queueC")]);
        let targets = resolver.resolve("t1", "order").await.unwrap();
        assert_eq!(names(&targets), vec!["queueB", "queueC"]);
        assert_eq!(store.reads(), vec!["/order/queue/t1".to_owned(), "pool1pool".to_owned()]);
    }

    #[tokio::test]
    async fn test_missing_assignment_names_key() {
        let (resolver, _) = resolver_with(&[]);
        let err = resolver.resolve("t9", "order").await.unwrap_err();
        match err {
            DispatchError::ConfigNotFound { key, stage } => {
                assert_eq!(key, "/order/queue/t9");
                assert_eq!(stage, LookupStage::Assignment);
            },
            other => panic!("expected ConfigNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_pool_is_distinct() {
        let (resolver, _) = resolver_with(&[("/order/queue/t1", "ghostpool")]);
        let err = resolver.resolve("t1", "order").await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::ConfigNotFound { ref key, stage: LookupStage::Pool }
                if key == "ghostpool"
        ));
    }

    #[tokio::test]
    async fn test_blank_value_is_not_found() {
        let (resolver, _) = resolver_with(&[("/order/queue/t1", "   ")]);
        assert!(matches!(
            resolver.resolve("t1", "order").await,
            Err(DispatchError::ConfigNotFound { stage: LookupStage::Assignment, .. })
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_unavailable() {
        let (resolver, store) = resolver_with(&[("/order/queue/t1", "queueA")]);
        store.make_unavailable("/order/queue/t1");
        assert!(matches!(
            resolver.resolve("t1", "order").await,
            Err(DispatchError::ConfigUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_service_name_scopes_lookup() {
        let (resolver, _) =
            resolver_with(&[("/order/queue/t1", "orders"), ("/billing/queue/t1", "invoices")]);
        assert_eq!(names(&resolver.resolve("t1", "billing").await.unwrap()), vec!["invoices"]);
    }
}
