//! Token header validation.
//!
//! Algorithm and key-id checks that run on the unverified header, before any
//! key-set lookup happens.
//!
//! # Security
//!
//! - Only asymmetric algorithms are accepted: identity providers publish public keys, so a
//!   symmetric `alg` can only come from a forged token.
//! - `none` is always rejected.

use jsonwebtoken::Algorithm;

use crate::error::AuthError;

/// Algorithms that are never accepted.
///
/// - `none`: no signature at all
/// - `HS256`, `HS384`, `HS512`: symmetric; an attacker could sign with the issuer's public key as
///   the HMAC secret
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Accepted algorithms.
///
/// `RS256` is what hosted user pools sign identity tokens with. `EdDSA` is
/// accepted for issuers publishing OKP keys.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["RS256", "EdDSA"];

/// Upper bound on the length of a `kid` header value.
pub const MAX_KID_LENGTH: usize = 256;

/// Validates the `alg` header and returns the matching [`Algorithm`].
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] if the algorithm is forbidden
/// or not in [`ACCEPTED_ALGORITHMS`].
///
/// # Examples
///
/// ```
/// use jsonwebtoken::Algorithm;
/// use tenantq_authn::validation::validate_algorithm;
///
/// assert_eq!(validate_algorithm("RS256").unwrap(), Algorithm::RS256);
/// assert!(validate_algorithm("HS256").is_err());
/// assert!(validate_algorithm("none").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<Algorithm, AuthError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not allowed for security reasons"
        )));
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not in accepted list"
        )));
    }

    alg.parse::<Algorithm>()
        .map_err(|e| AuthError::unsupported_algorithm(format!("Algorithm '{alg}': {e}")))
}

/// Validates a `kid` header value.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] if the key id is empty, longer than
/// [`MAX_KID_LENGTH`], or contains control characters.
pub fn validate_kid(kid: &str) -> Result<(), AuthError> {
    if kid.is_empty() {
        return Err(AuthError::malformed_token("kid header is empty"));
    }
    if kid.len() > MAX_KID_LENGTH {
        return Err(AuthError::malformed_token(format!(
            "kid header exceeds {MAX_KID_LENGTH} bytes"
        )));
    }
    if kid.chars().any(char::is_control) {
        return Err(AuthError::malformed_token("kid header contains control characters"));
    }
    Ok(())
}
