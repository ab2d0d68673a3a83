//! Security-focused verification tests.
//!
//! These exercise the full verifier pipeline against attack and failure
//! shapes: algorithm substitution, tampered signatures and payloads, expired
//! tokens, unknown key ids after rotation, and unreachable key sets.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use tenantq_authn::{
    IdentityClaims, KeySetCache, KeySetFetcher, KeySetStore, MemoryKeySetStore, SigningKeySet,
    TokenVerifier, assert_auth_error,
    error::AuthError,
    key_set_cache::KeySetFetchError,
    key_set_url,
    testutil::{
        StaticKeySetFetcher, TEST_ISSUER, craft_raw_jwt, create_rs256_token,
        create_signed_token, generate_test_keypair, identity_claims, okp_jwk, rsa_jwk,
    },
};
use zeroize::Zeroizing;

const KID: &str = "signing-key-1";

struct Fixture {
    verifier: TokenVerifier,
    fetcher: Arc<StaticKeySetFetcher>,
    pkcs8_der: Zeroizing<Vec<u8>>,
    public_key_b64: String,
}

/// Verifier whose key cache already holds the issuer's set with [`KID`].
async fn fixture() -> Fixture {
    let (pkcs8_der, public_key_b64) = generate_test_keypair();
    let keys = SigningKeySet::new(vec![okp_jwk(KID, &public_key_b64)]);

    let store = Arc::new(MemoryKeySetStore::new());
    store.put(&key_set_url(TEST_ISSUER), keys.clone()).await;

    let fetcher = Arc::new(StaticKeySetFetcher::new(keys));
    let cache = Arc::new(KeySetCache::new(store, fetcher.clone()));

    Fixture { verifier: TokenVerifier::new(cache), fetcher, pkcs8_der, public_key_b64 }
}

fn bearer(token: &str) -> HashMap<String, String> {
    HashMap::from([("Authorization".to_owned(), format!("Bearer {token}"))])
}

fn payload_of(token: &str) -> Value {
    let payload = token.split('.').nth(1).expect("payload segment");
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).expect("base64")).expect("json")
}

/// Replaces the signature character at `index` with a different one.
fn tamper_signature(token: &str, index: usize) -> String {
    let (message, signature) = token.rsplit_once('.').expect("signature");
    let mut chars: Vec<char> = signature.chars().collect();
    chars[index] = if chars[index] == 'A' { 'B' } else { 'A' };
    format!("{message}.{}", chars.into_iter().collect::<String>())
}

// ---------------------------------------------------------------------------
// Valid tokens
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_token_returns_embedded_claims_and_raw_token() {
    let f = fixture().await;
    let token = create_signed_token(&f.pkcs8_der, KID, &identity_claims("t1"));

    let (raw, claims) = f.verifier.verify(&bearer(&token)).await.expect("valid token");

    assert_eq!(raw, token);
    assert_eq!(claims.require_tenant_id().unwrap(), "t1");
    assert_eq!(serde_json::to_value(&claims).unwrap(), payload_of(&token));
    assert_eq!(f.fetcher.fetch_count(), 0, "issuer was already cached");
}

#[tokio::test]
async fn lowercase_header_is_accepted() {
    let f = fixture().await;
    let token = create_signed_token(&f.pkcs8_der, KID, &identity_claims("t2"));
    let headers = HashMap::from([("authorization".to_owned(), format!("Bearer {token}"))]);

    let (_, claims) = f.verifier.verify(&headers).await.expect("valid token");
    assert_eq!(claims.tenant_id.as_deref(), Some("t2"));
}

#[tokio::test]
async fn first_verification_fetches_and_second_is_cached() {
    let (pkcs8_der, public_key_b64) = generate_test_keypair();
    let fetcher = Arc::new(StaticKeySetFetcher::new(SigningKeySet::new(vec![okp_jwk(
        KID,
        &public_key_b64,
    )])));
    let cache = Arc::new(KeySetCache::new(Arc::new(MemoryKeySetStore::new()), fetcher.clone()));
    let verifier = TokenVerifier::new(cache);

    let token = create_signed_token(&pkcs8_der, KID, &identity_claims("t1"));
    verifier.verify_token(&token).await.expect("first");
    verifier.verify_token(&token).await.expect("second");

    assert_eq!(fetcher.fetch_count(), 1);
}

// ---------------------------------------------------------------------------
// Signature tampering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn altered_signature_is_rejected() {
    let f = fixture().await;
    let token = create_signed_token(&f.pkcs8_der, KID, &identity_claims("t1"));

    for index in [0, 7, 21, 42, 63, 80] {
        let tampered = tamper_signature(&token, index);
        let result = f.verifier.verify_token(&tampered).await;
        assert_auth_error!(result, SignatureInvalid, format!("signature index {index}"));
    }
}

#[tokio::test]
async fn swapped_payload_is_rejected() {
    let f = fixture().await;
    let token = create_signed_token(&f.pkcs8_der, KID, &identity_claims("t1"));
    let other = create_signed_token(&f.pkcs8_der, KID, &identity_claims("t-attacker"));

    let parts: Vec<&str> = token.split('.').collect();
    let other_payload = other.split('.').nth(1).unwrap();
    let forged = format!("{}.{}.{}", parts[0], other_payload, parts[2]);

    let result = f.verifier.verify_token(&forged).await;
    assert_auth_error!(result, SignatureInvalid);
}

#[tokio::test]
async fn signature_from_different_key_is_rejected() {
    let f = fixture().await;
    let (attacker_der, _) = generate_test_keypair();
    let token = create_signed_token(&attacker_der, KID, &identity_claims("t1"));

    let result = f.verifier.verify_token(&token).await;
    assert_auth_error!(result, SignatureInvalid);
}

#[tokio::test]
async fn empty_signature_is_rejected() {
    let f = fixture().await;
    let token = create_signed_token(&f.pkcs8_der, KID, &identity_claims("t1"));
    let (message, _) = token.rsplit_once('.').unwrap();

    let result = f.verifier.verify_token(&format!("{message}.")).await;
    assert_auth_error!(result, SignatureInvalid);
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_token_with_valid_signature_is_token_expired() {
    let f = fixture().await;
    let mut claims = identity_claims("t1");
    claims["exp"] = json!(Utc::now().timestamp() - 60);
    let token = create_signed_token(&f.pkcs8_der, KID, &claims);

    let result = f.verifier.verify_token(&token).await;
    assert_auth_error!(result, TokenExpired);
}

#[tokio::test]
async fn expired_token_with_bad_signature_is_signature_invalid() {
    let f = fixture().await;
    let mut claims = identity_claims("t1");
    claims["exp"] = json!(Utc::now().timestamp() - 60);
    let token = tamper_signature(&create_signed_token(&f.pkcs8_der, KID, &claims), 10);

    let result = f.verifier.verify_token(&token).await;
    assert_auth_error!(result, SignatureInvalid);
}

// ---------------------------------------------------------------------------
// Key lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rotated_key_is_unknown_and_not_refetched() {
    let f = fixture().await;
    let (rotated_der, _) = generate_test_keypair();
    let token = create_signed_token(&rotated_der, "signing-key-2", &identity_claims("t1"));

    let result = f.verifier.verify_token(&token).await;
    assert!(
        matches!(&result, Err(AuthError::UnknownSigningKey { kid }) if kid == "signing-key-2"),
        "got: {result:?}"
    );
    assert_eq!(f.fetcher.fetch_count(), 0);
}

#[tokio::test]
async fn missing_kid_is_malformed() {
    let f = fixture().await;
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::EdDSA),
        &identity_claims("t1"),
        &EncodingKey::from_ed_der(&f.pkcs8_der),
    )
    .unwrap();

    let result = f.verifier.verify_token(&token).await;
    assert_auth_error!(result, MalformedToken);
}

struct UnreachableFetcher;

#[async_trait]
impl KeySetFetcher for UnreachableFetcher {
    async fn fetch(&self, _url: &str) -> Result<SigningKeySet, KeySetFetchError> {
        Err(KeySetFetchError::Parse(
            serde_json::from_str::<Value>("<html>").expect_err("not json"),
        ))
    }
}

#[tokio::test]
async fn unreachable_key_set_is_key_set_unavailable() {
    let (pkcs8_der, _) = generate_test_keypair();
    let cache = Arc::new(KeySetCache::new(
        Arc::new(MemoryKeySetStore::new()),
        Arc::new(UnreachableFetcher),
    ));
    let verifier = TokenVerifier::new(cache);
    let token = create_signed_token(&pkcs8_der, KID, &identity_claims("t1"));

    let result = verifier.verify_token(&token).await;
    let expected_url = key_set_url(TEST_ISSUER);
    assert!(
        matches!(&result, Err(AuthError::KeySetUnavailable { url, .. }) if *url == expected_url),
        "got: {result:?}"
    );
}

// ---------------------------------------------------------------------------
// Algorithm substitution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn alg_none_is_rejected_before_key_lookup() {
    let (_, public_key_b64) = generate_test_keypair();
    let fetcher = Arc::new(StaticKeySetFetcher::new(SigningKeySet::new(vec![okp_jwk(
        KID,
        &public_key_b64,
    )])));
    let verifier = TokenVerifier::new(Arc::new(KeySetCache::new(
        Arc::new(MemoryKeySetStore::new()),
        fetcher.clone(),
    )));

    let token = craft_raw_jwt(&json!({"alg": "none", "kid": KID}), &identity_claims("t1"));
    let result = verifier.verify_token(&token).await;

    assert_auth_error!(result, UnsupportedAlgorithm);
    assert_eq!(fetcher.fetch_count(), 0, "no key fetch for a forbidden algorithm");
}

#[tokio::test]
async fn hmac_signed_with_public_key_is_rejected() {
    let f = fixture().await;
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(KID.to_owned());
    let token = jsonwebtoken::encode(
        &header,
        &identity_claims("t1"),
        &EncodingKey::from_secret(f.public_key_b64.as_bytes()),
    )
    .unwrap();

    let result = f.verifier.verify_token(&token).await;
    assert_auth_error!(result, UnsupportedAlgorithm);
}

#[tokio::test]
async fn eddsa_header_naming_rsa_key_is_rejected() {
    let store = Arc::new(MemoryKeySetStore::new());
    let keys = SigningKeySet::new(vec![rsa_jwk("rsa-kid")]);
    store.put(&key_set_url(TEST_ISSUER), keys.clone()).await;
    let verifier = TokenVerifier::new(Arc::new(KeySetCache::new(
        store,
        Arc::new(StaticKeySetFetcher::new(keys)),
    )));

    let header = json!({"alg": "EdDSA", "kid": "rsa-kid"});
    let unsigned = craft_raw_jwt(&header, &identity_claims("t1"));
    let token = format!("{unsigned}{}", URL_SAFE_NO_PAD.encode([7u8; 64]));

    let result = verifier.verify_token(&token).await;
    assert_auth_error!(result, SignatureInvalid);
}

#[tokio::test]
async fn rs256_header_naming_okp_key_is_rejected() {
    let f = fixture().await;
    let token = create_rs256_token(KID, &identity_claims("t1"));

    let result = f.verifier.verify_token(&token).await;
    assert_auth_error!(result, SignatureInvalid);
}

// ---------------------------------------------------------------------------
// RS256
// ---------------------------------------------------------------------------

async fn rsa_verifier() -> TokenVerifier {
    let store = Arc::new(MemoryKeySetStore::new());
    let keys = SigningKeySet::new(vec![rsa_jwk("rsa-1")]);
    store.put(&key_set_url(TEST_ISSUER), keys.clone()).await;
    TokenVerifier::new(Arc::new(KeySetCache::new(store, Arc::new(StaticKeySetFetcher::new(keys)))))
}

#[tokio::test]
async fn rs256_token_verifies_against_modulus_and_exponent() {
    let verifier = rsa_verifier().await;
    let token = create_rs256_token("rsa-1", &identity_claims("t9"));

    let claims = verifier.verify_token(&token).await.expect("rs256 token");
    assert_eq!(claims.require_tenant_id().unwrap(), "t9");
    assert_eq!(serde_json::to_value(&claims).unwrap(), payload_of(&token));
}

#[tokio::test]
async fn rs256_tampered_signature_is_rejected() {
    let verifier = rsa_verifier().await;
    let token = create_rs256_token("rsa-1", &identity_claims("t9"));

    let result = verifier.verify_token(&tamper_signature(&token, 100)).await;
    assert_auth_error!(result, SignatureInvalid);
}

// ---------------------------------------------------------------------------
// Credential extraction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_or_empty_authorization_is_missing_credential() {
    let f = fixture().await;

    let result = f.verifier.verify(&HashMap::new()).await;
    assert_auth_error!(result, MissingCredential);

    let headers = HashMap::from([("Authorization".to_owned(), "Bearer".to_owned())]);
    let result = f.verifier.verify(&headers).await;
    assert_auth_error!(result, MissingCredential);
}

#[tokio::test]
async fn garbage_token_is_malformed() {
    let f = fixture().await;
    let result: Result<IdentityClaims, AuthError> = f.verifier.verify_token("not-a-token").await;
    assert_auth_error!(result, MalformedToken);
}
