//! Issuer signing-key sets.
//!
//! A [`SigningKeySet`] is the parsed `keys` array an issuer publishes at its
//! well-known key-set URL. Entries are standard JWKs (RSA `n`/`e`, OKP `x`,
//! EC `x`/`y`), kept in the order the issuer lists them.

use std::sync::Arc;

use jsonwebtoken::{
    Algorithm, DecodingKey,
    jwk::{AlgorithmParameters, Jwk, KeyAlgorithm},
};
use serde::Deserialize;

use crate::error::AuthError;

/// Path appended to an issuer URL to reach its published key set.
pub const WELL_KNOWN_KEY_SET_PATH: &str = "/.well-known/jwks.json";

/// Builds the key-set URL for an issuer.
///
/// ```
/// use tenantq_authn::key_set::key_set_url;
///
/// assert_eq!(
///     key_set_url("https://cognito-idp.us-west-2.amazonaws.com/us-west-2_GBhKoSPIh"),
///     "https://cognito-idp.us-west-2.amazonaws.com/us-west-2_GBhKoSPIh/.well-known/jwks.json"
/// );
/// ```
#[must_use]
pub fn key_set_url(issuer: &str) -> String {
    format!("{}{WELL_KNOWN_KEY_SET_PATH}", issuer.trim_end_matches('/'))
}

/// An issuer's published signing keys.
#[derive(Clone, Debug, Default)]
pub struct SigningKeySet {
    keys: Arc<[Jwk]>,
}

#[derive(Deserialize)]
struct KeySetDocument {
    keys: Vec<Jwk>,
}

impl SigningKeySet {
    /// Wraps an already-parsed list of keys.
    #[must_use]
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self { keys: keys.into() }
    }

    /// Parses a key-set document of the form `{"keys": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the document is not a valid key set.
    pub fn from_json(document: &[u8]) -> Result<Self, serde_json::Error> {
        let parsed: KeySetDocument = serde_json::from_slice(document)?;
        Ok(Self::new(parsed.keys))
    }

    /// Keys in published order.
    #[must_use]
    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// Number of keys in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Looks up a key by id. See [`find_signing_key`].
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        find_signing_key(&self.keys, kid)
    }
}

/// Returns the first key whose `kid` equals `kid`.
///
/// Key sets hold a handful of entries, so this is a plain linear scan.
#[must_use]
pub fn find_signing_key<'a>(keys: &'a [Jwk], kid: &str) -> Option<&'a Jwk> {
    keys.iter().find(|jwk| jwk.common.key_id.as_deref() == Some(kid))
}

/// Whether `jwk` can verify a signature made with `algorithm`.
///
/// The key type must match the algorithm family (RSA for `RS256`, OKP for
/// `EdDSA`), and a declared `alg` on the key must equal `algorithm`.
#[must_use]
pub fn key_fits_algorithm(jwk: &Jwk, algorithm: Algorithm) -> bool {
    let declared = jwk.common.key_algorithm.as_ref();
    match (&jwk.algorithm, algorithm) {
        (AlgorithmParameters::RSA(_), Algorithm::RS256) => {
            matches!(declared, None | Some(KeyAlgorithm::RS256))
        },
        (AlgorithmParameters::OctetKeyPair(_), Algorithm::EdDSA) => {
            matches!(declared, None | Some(KeyAlgorithm::EdDSA))
        },
        _ => false,
    }
}

/// Builds a verifier key from JWK key material.
///
/// # Errors
///
/// Returns [`AuthError::SignatureInvalid`] if the key material cannot be
/// decoded: a key that cannot verify anything rejects the signature.
pub fn to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    DecodingKey::from_jwk(jwk).map_err(|e| {
        tracing::warn!(
            kid = jwk.common.key_id.as_deref().unwrap_or_default(),
            error = %e,
            "unusable key material in signing key set"
        );
        AuthError::signature_invalid()
    })
}
