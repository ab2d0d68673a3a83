//! # tenantq authentication
//!
//! Bearer identity-token verification for the tenant dispatch path.
//!
//! This crate provides:
//! - **Token verification**: bearer extraction, unverified header/claims decoding, signature and
//!   expiry checks
//! - **Key cache**: per-issuer signing-key sets fetched lazily from the issuer's well-known URL
//! - **Algorithm validation**: only asymmetric algorithms (RS256, EdDSA) are accepted
//!
//! ## Example
//!
//! ```no_run
//! use std::{collections::HashMap, sync::Arc, time::Duration};
//! use tenantq_authn::{KeySetCache, TokenVerifier};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(KeySetCache::with_http(Duration::from_secs(10))?);
//! let verifier = TokenVerifier::new(cache);
//!
//! let headers = HashMap::from([("Authorization".to_owned(), "Bearer eyJ...".to_owned())]);
//! let (_token, claims) = verifier.verify(&headers).await?;
//! println!("tenant {}", claims.require_tenant_id()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **`testutil`**: key generation, token signing and fake fetchers for tests
//! - **`failpoints`**: enables the `key-set-before-fetch` failpoint

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Authentication error types.
pub mod error;
/// Token decoding and verification.
pub mod jwt;
/// Issuer key-set parsing and lookup.
pub mod key_set;
/// Process-wide key-set cache.
pub mod key_set_cache;
/// Shared test helpers.
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
/// Algorithm validation.
pub mod validation;

pub use error::{AuthError, Result};
pub use jwt::{IdentityClaims, IdentityPoolRef, TokenVerifier};
pub use key_set::{SigningKeySet, find_signing_key, key_set_url};
pub use key_set_cache::{
    DEFAULT_FETCH_TIMEOUT, HttpKeySetFetcher, KeySetCache, KeySetFetcher, KeySetStore,
    MemoryKeySetStore, TtlKeySetStore,
};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
