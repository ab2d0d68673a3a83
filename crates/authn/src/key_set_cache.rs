//! Process-wide cache of issuer signing-key sets.
//!
//! [`KeySetCache`] maps a key-set URL to the [`SigningKeySet`] fetched from it.
//! Sets are fetched lazily on first use and, with the default
//! [`MemoryKeySetStore`], retained for the lifetime of the process.
//!
//! # Architecture
//!
//! ```text
//! token arrives → issuer → key-set URL
//!              → KeySetStore::get(url)      hit?  → done
//!              → KeySetFetcher::fetch(url)  (network GET, no retry)
//!              → KeySetStore::put(url, set)
//! ```
//!
//! # Concurrency
//!
//! No lock is held across the fetch. Two requests that miss on the same URL
//! at the same time both fetch; the second `put` overwrites the first with
//! identical content. Readers of other URLs are never blocked by a fetch.
//!
//! # Staleness
//!
//! [`MemoryKeySetStore`] never evicts, so a key the issuer rotates in after
//! the first fetch stays unknown until restart. [`TtlKeySetStore`] bounds
//! that window for deployments that prefer extra fetches over staleness.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use fail::fail_point;
use moka::future::Cache;
use parking_lot::RwLock;
use thiserror::Error;

use crate::{error::AuthError, key_set::SigningKeySet};

/// Default timeout for key-set HTTP fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Storage for fetched key sets, keyed by key-set URL.
///
/// Implementations must be safe for concurrent use. `put` for an existing URL
/// replaces the entry (last write wins).
#[async_trait]
pub trait KeySetStore: Send + Sync {
    /// Returns the key set stored for `url`, if any.
    async fn get(&self, url: &str) -> Option<SigningKeySet>;

    /// Stores `keys` for `url`.
    async fn put(&self, url: &str, keys: SigningKeySet);
}

/// Unbounded in-memory store. Entries are never evicted.
#[derive(Debug, Default, Clone)]
pub struct MemoryKeySetStore {
    sets: Arc<RwLock<HashMap<String, SigningKeySet>>>,
}

impl MemoryKeySetStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached issuers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.read().len()
    }

    /// Whether nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.read().is_empty()
    }
}

#[async_trait]
impl KeySetStore for MemoryKeySetStore {
    async fn get(&self, url: &str) -> Option<SigningKeySet> {
        self.sets.read().get(url).cloned()
    }

    async fn put(&self, url: &str, keys: SigningKeySet) {
        self.sets.write().insert(url.to_owned(), keys);
    }
}

/// In-memory store whose entries expire after a fixed time-to-live.
#[derive(Clone)]
pub struct TtlKeySetStore {
    sets: Cache<String, SigningKeySet>,
}

impl TtlKeySetStore {
    /// Creates a store whose entries live for `ttl` after insertion.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { sets: Cache::builder().time_to_live(ttl).build() }
    }
}

#[async_trait]
impl KeySetStore for TtlKeySetStore {
    async fn get(&self, url: &str) -> Option<SigningKeySet> {
        self.sets.get(url).await
    }

    async fn put(&self, url: &str, keys: SigningKeySet) {
        self.sets.insert(url.to_owned(), keys).await;
    }
}

/// Failure to obtain a key set from its URL.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeySetFetchError {
    /// Transport failure or non-success status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body is not a key-set document.
    #[error("Invalid key set document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Retrieves a key set from its URL.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    /// Fetches and parses the key set published at `url`.
    async fn fetch(&self, url: &str) -> Result<SigningKeySet, KeySetFetchError>;
}

/// Fetches key sets with a plain HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    client: reqwest::Client,
}

impl HttpKeySetFetcher {
    /// Creates a fetcher whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, KeySetFetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Creates a fetcher on top of an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch(&self, url: &str) -> Result<SigningKeySet, KeySetFetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        Ok(SigningKeySet::from_json(&body)?)
    }
}

/// Lazily-populated cache of issuer key sets.
///
/// Shared by every request in the process; cheap to wrap in an [`Arc`].
pub struct KeySetCache {
    store: Arc<dyn KeySetStore>,
    fetcher: Arc<dyn KeySetFetcher>,
    hits: AtomicU64,
    fetches: AtomicU64,
}

impl KeySetCache {
    /// Creates a cache over the given store and fetcher.
    #[must_use]
    pub fn new(store: Arc<dyn KeySetStore>, fetcher: Arc<dyn KeySetFetcher>) -> Self {
        Self { store, fetcher, hits: AtomicU64::new(0), fetches: AtomicU64::new(0) }
    }

    /// Creates a never-evicting cache that fetches over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_http(timeout: Duration) -> Result<Self, KeySetFetchError> {
        Ok(Self::new(
            Arc::new(MemoryKeySetStore::new()),
            Arc::new(HttpKeySetFetcher::new(timeout)?),
        ))
    }

    /// Returns the key set for `url`, fetching and storing it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeySetUnavailable`] if the fetch or parse fails.
    /// Nothing is stored in that case.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_fetch(&self, url: &str) -> Result<SigningKeySet, AuthError> {
        if let Some(keys) = self.store.get(url).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(cache = "hit", "signing key set found");
            return Ok(keys);
        }
        tracing::debug!(cache = "miss", "fetching signing key set");

        fail_point!("key-set-before-fetch", |_| {
            Err(AuthError::key_set_unavailable(url, "injected failure before fetch"))
        });

        self.fetches.fetch_add(1, Ordering::Relaxed);
        let keys = self.fetcher.fetch(url).await.map_err(|e| {
            tracing::warn!(error = %e, "failed to fetch signing key set");
            AuthError::key_set_unavailable(url, e.to_string())
        })?;

        self.store.put(url, keys.clone()).await;
        tracing::info!(key_count = keys.len(), "signing key set cached");

        Ok(keys)
    }

    /// Number of lookups answered from the store.
    #[must_use]
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of network fetches issued.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::testutil::{StaticKeySetFetcher, generate_test_keypair, okp_jwk};

    const URL: &str = "https://issuer.example.com/pool/.well-known/jwks.json";

    fn key_set(kid: &str) -> SigningKeySet {
        let (_, public_key_b64) = generate_test_keypair();
        SigningKeySet::new(vec![okp_jwk(kid, &public_key_b64)])
    }

    /// Fetcher that always fails.
    struct FailingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeySetFetcher for FailingFetcher {
        async fn fetch(&self, _url: &str) -> Result<SigningKeySet, KeySetFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(KeySetFetchError::Parse(
                serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json"),
            ))
        }
    }

    #[tokio::test]
    async fn test_miss_fetches_then_hit_does_not() {
        let fetcher = Arc::new(StaticKeySetFetcher::new(key_set("k1")));
        let cache = KeySetCache::new(Arc::new(MemoryKeySetStore::new()), fetcher.clone());

        let first = cache.get_or_fetch(URL).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(fetcher.fetch_count(), 1);

        let second = cache.get_or_fetch(URL).await.unwrap();
        assert!(second.find("k1").is_some());
        assert_eq!(fetcher.fetch_count(), 1, "cached issuer must not trigger a fetch");
        assert_eq!(cache.hit_count(), 1);
        assert_eq!(cache.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_key_set_unavailable_and_not_cached() {
        let fetcher = Arc::new(FailingFetcher { calls: AtomicUsize::new(0) });
        let store = Arc::new(MemoryKeySetStore::new());
        let cache = KeySetCache::new(store.clone(), fetcher.clone());

        let result = cache.get_or_fetch(URL).await;
        assert!(
            matches!(&result, Err(AuthError::KeySetUnavailable { url, .. }) if url == URL),
            "got: {result:?}"
        );
        assert!(store.is_empty());

        // A later request tries again rather than caching the failure.
        let _ = cache.get_or_fetch(URL).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_prepopulated_store_needs_no_fetcher_call() {
        let store = Arc::new(MemoryKeySetStore::new());
        store.put(URL, key_set("pre")).await;
        let fetcher = Arc::new(FailingFetcher { calls: AtomicUsize::new(0) });
        let cache = KeySetCache::new(store, fetcher.clone());

        assert!(cache.get_or_fetch(URL).await.unwrap().find("pre").is_some());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_issuers_are_cached_independently() {
        let fetcher = Arc::new(StaticKeySetFetcher::new(key_set("shared")));
        let store = Arc::new(MemoryKeySetStore::new());
        let cache = KeySetCache::new(store.clone(), fetcher.clone());

        cache.get_or_fetch("https://a.example.com/.well-known/jwks.json").await.unwrap();
        cache.get_or_fetch("https://b.example.com/.well-known/jwks.json").await.unwrap();

        assert_eq!(fetcher.fetch_count(), 2);
        assert_eq!(store.len(), 2);
    }

    /// Concurrent misses on the same new issuer may each fetch, but never
    /// more than once per caller, and all callers see the same keys.
    #[tokio::test]
    async fn test_concurrent_misses_fetch_at_most_once_per_caller() {
        const CALLERS: usize = 16;

        let fetcher = Arc::new(
            StaticKeySetFetcher::new(key_set("race")).with_delay(Duration::from_millis(20)),
        );
        let cache = Arc::new(KeySetCache::new(Arc::new(MemoryKeySetStore::new()), fetcher.clone()));

        let mut handles = Vec::new();
        for _ in 0..CALLERS {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.get_or_fetch(URL).await }));
        }

        for handle in handles {
            let keys = handle.await.expect("task should not panic").expect("fetch succeeds");
            assert!(keys.find("race").is_some());
        }

        let fetches = fetcher.fetch_count();
        assert!((1..=CALLERS).contains(&fetches), "unexpected fetch count {fetches}");

        // Once populated, further lookups are free.
        fetcher.reset_count();
        cache.get_or_fetch(URL).await.unwrap();
        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_ttl_store_expires_entries() {
        let store = TtlKeySetStore::new(Duration::from_millis(50));
        store.put(URL, key_set("ttl")).await;
        assert!(store.get(URL).await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(store.get(URL).await.is_none(), "entry should expire after its TTL");
    }

    #[tokio::test]
    async fn test_ttl_store_refetches_after_expiry() {
        let fetcher = Arc::new(StaticKeySetFetcher::new(key_set("ttl")));
        let cache = KeySetCache::new(
            Arc::new(TtlKeySetStore::new(Duration::from_millis(50))),
            fetcher.clone(),
        );

        cache.get_or_fetch(URL).await.unwrap();
        cache.get_or_fetch(URL).await.unwrap();
        assert_eq!(fetcher.fetch_count(), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        cache.get_or_fetch(URL).await.unwrap();
        assert_eq!(fetcher.fetch_count(), 2);
    }
}
