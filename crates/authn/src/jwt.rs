//! Identity-token verification.
//!
//! [`TokenVerifier::verify`] takes the inbound request headers and returns the
//! raw bearer token together with its verified [`IdentityClaims`]:
//!
//! 1. Extract the bearer credential from `Authorization` / `authorization`.
//! 2. Decode header and claims without trust to learn `alg`, `kid` and `iss`.
//! 3. Reject forbidden algorithms before any network activity.
//! 4. Resolve the issuer's key set through the [`KeySetCache`].
//! 5. Find the key by `kid`, verify the signature over `header.payload`.
//! 6. Check `exp` against the current time.
//!
//! # Example
//!
//! ```no_run
//! use std::{collections::HashMap, sync::Arc, time::Duration};
//! use tenantq_authn::{KeySetCache, TokenVerifier};
//!
//! # async fn example(headers: HashMap<String, String>) -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(KeySetCache::with_http(Duration::from_secs(10))?);
//! let verifier = TokenVerifier::new(cache);
//!
//! let (token, claims) = verifier.verify(&headers).await?;
//! println!("tenant: {}", claims.require_tenant_id()?);
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, sync::Arc};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
    error::AuthError,
    key_set::{key_fits_algorithm, key_set_url, to_decoding_key},
    key_set_cache::KeySetCache,
    validation::{validate_algorithm, validate_kid},
};

/// Header names the bearer credential is read from, in lookup order.
pub const AUTHORIZATION_HEADERS: [&str; 2] = ["Authorization", "authorization"];

/// Claim carrying the tenant identifier.
pub const TENANT_ID_CLAIM: &str = "custom:tenant_id";

/// Claim carrying the federated identity pool (`region:uuid`).
pub const IDENTITY_POOL_CLAIM: &str = "custom:identity_pool";

/// Identity-token claims.
///
/// Claims not modelled as fields are kept in [`extra`](Self::extra) so the
/// serialized form equals what the issuer signed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Issuer URL.
    pub iss: String,
    /// Subject (user identifier).
    pub sub: String,
    /// Tenant identifier.
    #[serde(rename = "custom:tenant_id", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Identity-pool reference, `region:uuid`.
    #[serde(rename = "custom:identity_pool", default, skip_serializing_if = "Option::is_none")]
    pub identity_pool: Option<String>,
    /// Expiration time (seconds since epoch).
    pub exp: u64,
    /// Token-use marker (`id` or `access`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,
    /// All remaining claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Region and identifier of a federated identity pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityPoolRef {
    /// Region prefix, e.g. `us-west-2`.
    pub region: String,
    /// Full pool identifier including the region prefix.
    pub pool_id: String,
}

impl IdentityClaims {
    /// Returns the tenant id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingClaim`] if the claim is absent or empty.
    pub fn require_tenant_id(&self) -> Result<&str, AuthError> {
        self.tenant_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::missing_claim(TENANT_ID_CLAIM))
    }

    /// Parses the identity-pool claim into region and pool id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingClaim`] if the claim is absent, or
    /// [`AuthError::InvalidClaim`] if it has no `region:` prefix.
    pub fn identity_pool(&self) -> Result<IdentityPoolRef, AuthError> {
        let pool_id = self
            .identity_pool
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AuthError::missing_claim(IDENTITY_POOL_CLAIM))?;

        match pool_id.split_once(':') {
            Some((region, id)) if !region.is_empty() && !id.is_empty() => {
                Ok(IdentityPoolRef { region: region.to_owned(), pool_id: pool_id.to_owned() })
            },
            _ => Err(AuthError::invalid_claim(IDENTITY_POOL_CLAIM, "expected 'region:id'")),
        }
    }

    /// Issuer with its URL scheme stripped, as used for login-provider names.
    #[must_use]
    pub fn login_provider(&self) -> &str {
        self.iss
            .strip_prefix("https://")
            .or_else(|| self.iss.strip_prefix("http://"))
            .unwrap_or(&self.iss)
    }

    /// Whether the token has expired at `now` (seconds since epoch).
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        u64::try_from(now).is_ok_and(|now| self.exp <= now)
    }
}

/// Unverified token header.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    /// Signing algorithm as written by the issuer.
    pub alg: String,
    /// Key id.
    #[serde(default)]
    pub kid: Option<String>,
    /// Token type.
    #[serde(default)]
    pub typ: Option<String>,
}

/// Extracts the bearer credential from request headers.
///
/// The value's first whitespace-delimited word is the scheme; the second is
/// the token.
///
/// # Errors
///
/// Returns [`AuthError::MissingCredential`] if neither header is present or
/// nothing follows the scheme.
pub fn extract_bearer(headers: &HashMap<String, String>) -> Result<&str, AuthError> {
    let value = AUTHORIZATION_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .ok_or_else(AuthError::missing_credential)?;

    value.split_whitespace().nth(1).ok_or_else(AuthError::missing_credential)
}

fn token_segments(token: &str) -> Result<[&str; 3], AuthError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok([header, payload, signature]),
        _ => Err(AuthError::malformed_token("token must have 3 parts separated by dots")),
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::malformed_token(format!("failed to decode token {what}: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::malformed_token(format!("failed to parse token {what}: {e}")))
}

/// Decodes the token header without verification.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] if the token is not three segments or
/// the header is not base64url-encoded JSON.
pub fn decode_token_header(token: &str) -> Result<TokenHeader, AuthError> {
    let [header, _, _] = token_segments(token)?;
    decode_segment(header, "header")
}

/// Decodes the token claims without verification.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] if the payload cannot be decoded, or
/// [`AuthError::MissingClaim`] if `iss` is empty.
pub fn decode_token_claims(token: &str) -> Result<IdentityClaims, AuthError> {
    let [_, payload, _] = token_segments(token)?;
    let claims: IdentityClaims = decode_segment(payload, "claims")?;
    if claims.iss.is_empty() {
        return Err(AuthError::missing_claim("iss"));
    }
    Ok(claims)
}

/// Verifies bearer tokens against issuer key sets.
#[derive(Clone)]
pub struct TokenVerifier {
    cache: Arc<KeySetCache>,
}

impl TokenVerifier {
    /// Creates a verifier sharing the process-wide key cache.
    #[must_use]
    pub fn new(cache: Arc<KeySetCache>) -> Self {
        Self { cache }
    }

    /// The key cache backing this verifier.
    #[must_use]
    pub fn cache(&self) -> &Arc<KeySetCache> {
        &self.cache
    }

    /// Verifies the bearer token in `headers`.
    ///
    /// Returns the raw token (needed for credential exchange) and its claims.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`]; see [`verify_token`](Self::verify_token).
    pub async fn verify(
        &self,
        headers: &HashMap<String, String>,
    ) -> Result<(String, IdentityClaims), AuthError> {
        let token = extract_bearer(headers)?;
        let claims = self.verify_token(token).await?;
        Ok((token.to_owned(), claims))
    }

    /// Verifies a raw token and returns its claims.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MalformedToken`] for undecodable segments or a bad `kid`
    /// - [`AuthError::UnsupportedAlgorithm`] for `none`, HMAC or unknown `alg`
    /// - [`AuthError::KeySetUnavailable`] if the issuer's keys cannot be fetched
    /// - [`AuthError::UnknownSigningKey`] if no key matches `kid`
    /// - [`AuthError::SignatureInvalid`] if the key type does not fit `alg` or
    ///   the signature does not verify
    /// - [`AuthError::TokenExpired`] if `exp` is not in the future
    #[tracing::instrument(skip(self, token), fields(issuer = tracing::field::Empty))]
    pub async fn verify_token(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        let header = decode_token_header(token)?;
        let algorithm = validate_algorithm(&header.alg)?;
        let kid =
            header.kid.ok_or_else(|| AuthError::malformed_token("token header missing 'kid'"))?;
        validate_kid(&kid)?;

        let claims = decode_token_claims(token)?;
        tracing::Span::current().record("issuer", claims.iss.as_str());

        let keys = self.cache.get_or_fetch(&key_set_url(&claims.iss)).await?;
        let jwk = keys.find(&kid).ok_or_else(|| {
            tracing::warn!(kid = %kid, "no signing key matches token kid");
            AuthError::unknown_signing_key(&kid)
        })?;
        if !key_fits_algorithm(jwk, algorithm) {
            tracing::warn!(kid = %kid, alg = %header.alg, "signing key does not fit token alg");
            return Err(AuthError::signature_invalid());
        }
        let decoding_key = to_decoding_key(jwk)?;

        let (message, signature) =
            token.rsplit_once('.').ok_or_else(|| AuthError::malformed_token("missing signature"))?;
        let verified =
            jsonwebtoken::crypto::verify(signature, message.as_bytes(), &decoding_key, algorithm)
                .unwrap_or(false);
        if !verified {
            tracing::warn!(kid = %kid, "token signature did not verify");
            return Err(AuthError::signature_invalid());
        }

        if claims.is_expired_at(Utc::now().timestamp()) {
            tracing::warn!(exp = claims.exp, "token expired");
            return Err(AuthError::token_expired());
        }

        tracing::debug!(kid = %kid, "token verified");
        Ok(claims)
    }
}
