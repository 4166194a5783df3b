//! ID-token payload handling.
//!
//! The default path decodes the JWT payload **without** checking its
//! signature. That is an inherited, deliberate trust decision: the token is
//! received over a server-to-server TLS channel straight from the IdP's
//! token endpoint, and that channel is the trust boundary. Deployments that
//! want cryptographic verification opt in via
//! [`TokenVerification::VerifyJwks`], which validates against the IdP's
//! published JWK set before extracting claims.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Identity claims extracted from an ID token — the durable artifact of a
/// successful login.
///
/// `subject` is required: a payload without `sub` is a decode failure, not a
/// degraded success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// How the ID token returned by the token endpoint is trusted.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum TokenVerification {
    /// Decode the payload without verifying the signature, trusting the TLS
    /// channel to the token endpoint. Default; matches the original
    /// deployment.
    TrustTransport,
    /// Verify the signature against the IdP's published JWK set, optionally
    /// pinning the `iss` claim.
    VerifyJwks {
        jwks_url: Url,
        issuer: Option<String>,
    },
}

impl Default for TokenVerification {
    fn default() -> Self {
        Self::TrustTransport
    }
}

/// Decode the claims from a JWT payload without signature verification.
///
/// # Errors
///
/// Returns [`Error::ClaimDecodeFailed`] if the token is not three dot-joined
/// segments, the payload is not base64url, or `sub` is absent.
pub fn decode_claims_unverified(id_token: &str) -> Result<IdentityClaims, Error> {
    let mut segments = id_token.split('.');
    let (Some(_header), Some(payload), Some(_sig), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(Error::ClaimDecodeFailed(
            "token is not a three-segment JWT".into(),
        ));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| Error::ClaimDecodeFailed(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&bytes).map_err(|e| Error::ClaimDecodeFailed(e.to_string()))
}

/// Verify the token against a JWK set and extract the claims.
///
/// The key is selected by the token header's `kid`; when the header carries
/// no `kid` and the set holds exactly one key, that key is used. The
/// audience is pinned to `client_id` and `exp`/`nbf` are validated. The JWK
/// set fetch is bounded by `timeout`, same as the token exchange itself.
pub(crate) async fn verify_claims_jwks(
    http: &reqwest::Client,
    jwks_url: &Url,
    issuer: Option<&str>,
    client_id: &str,
    id_token: &str,
    timeout: Duration,
) -> Result<IdentityClaims, Error> {
    let jwks: JwkSet = http
        .get(jwks_url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(Error::from_transport)?
        .error_for_status()
        .map_err(Error::from_transport)?
        .json()
        .await
        .map_err(Error::from_transport)?;

    let header =
        decode_header(id_token).map_err(|e| Error::ClaimDecodeFailed(e.to_string()))?;

    let jwk = match header.kid.as_deref() {
        Some(kid) => jwks.find(kid),
        None if jwks.keys.len() == 1 => jwks.keys.first(),
        None => None,
    }
    .ok_or_else(|| Error::ClaimDecodeFailed("no JWK matches the token kid".into()))?;

    let key =
        DecodingKey::from_jwk(jwk).map_err(|e| Error::ClaimDecodeFailed(e.to_string()))?;

    let mut validation = Validation::new(header.alg);
    validation.set_audience(&[client_id]);
    if let Some(iss) = issuer {
        validation.set_issuer(&[iss]);
    }

    decode::<IdentityClaims>(id_token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| Error::ClaimDecodeFailed(e.to_string()))
}

#[cfg(test)]
pub(crate) fn encode_unsigned_jwt(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(b"test-signature");
    format!("{header}.{body}.{signature}")
}

#[cfg(test)]
pub(crate) const TEST_HMAC_SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

#[cfg(test)]
pub(crate) fn encode_hs256_jwt(kid: &str, payload: &serde_json::Value) -> String {
    let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256);
    header.kid = Some(kid.to_string());
    jsonwebtoken::encode(
        &header,
        payload,
        &jsonwebtoken::EncodingKey::from_secret(TEST_HMAC_SECRET),
    )
    .unwrap()
}

#[cfg(test)]
pub(crate) fn test_jwk_set(kid: &str) -> serde_json::Value {
    serde_json::json!({
        "keys": [{
            "kty": "oct",
            "kid": kid,
            "k": URL_SAFE_NO_PAD.encode(TEST_HMAC_SECRET),
        }]
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn signed_token(audience: &str) -> String {
        encode_hs256_jwt(
            "key-1",
            &json!({
                "sub": "abc123",
                "email": "a@b.com",
                "aud": audience,
                "exp": 4_102_444_800u64,
            }),
        )
    }

    async fn serve_jwks(server: &MockServer, body: serde_json::Value) -> Url {
        Mock::given(method("GET"))
            .and(path("/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
        format!("{}/jwks.json", server.uri()).parse().unwrap()
    }

    #[test]
    fn decodes_well_formed_payload() {
        let token = encode_unsigned_jwt(&json!({
            "sub": "abc123",
            "email": "a@b.com",
            "name": "A B",
            "aud": "client-1",
            "exp": 4_102_444_800u64,
        }));
        let claims = decode_claims_unverified(&token).unwrap();
        assert_eq!(claims.subject, "abc123");
        assert_eq!(claims.email.as_deref(), Some("a@b.com"));
        assert_eq!(claims.name.as_deref(), Some("A B"));
    }

    #[test]
    fn optional_claims_may_be_absent() {
        let token = encode_unsigned_jwt(&json!({ "sub": "abc123" }));
        let claims = decode_claims_unverified(&token).unwrap();
        assert_eq!(claims.subject, "abc123");
        assert_eq!(claims.email, None);
        assert_eq!(claims.name, None);
    }

    #[test]
    fn missing_subject_is_a_decode_failure() {
        let token = encode_unsigned_jwt(&json!({ "email": "a@b.com" }));
        let err = decode_claims_unverified(&token).unwrap_err();
        assert_eq!(err.kind(), "claim_decode_failed");
    }

    #[test]
    fn rejects_non_jwt_input() {
        for bad in ["", "not-a-token", "a.b", "a.b.c.d"] {
            let err = decode_claims_unverified(bad).unwrap_err();
            assert_eq!(err.kind(), "claim_decode_failed", "input {bad:?}");
        }
    }

    #[test]
    fn rejects_payload_that_is_not_base64url() {
        let err = decode_claims_unverified("aGVhZGVy.!!!not-base64!!!.c2ln").unwrap_err();
        assert_eq!(err.kind(), "claim_decode_failed");
    }

    #[test]
    fn rejects_payload_that_is_not_json() {
        let garbage = URL_SAFE_NO_PAD.encode(b"plain text, not an object");
        let err = decode_claims_unverified(&format!("h.{garbage}.s")).unwrap_err();
        assert_eq!(err.kind(), "claim_decode_failed");
    }

    #[tokio::test]
    async fn jwks_accepts_a_validly_signed_token() {
        let server = MockServer::start().await;
        let jwks_url = serve_jwks(&server, test_jwk_set("key-1")).await;
        let token = signed_token("client-1");

        let claims = verify_claims_jwks(
            &reqwest::Client::new(),
            &jwks_url,
            None,
            "client-1",
            &token,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(claims.subject, "abc123");
        assert_eq!(claims.email.as_deref(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn jwks_rejects_a_tampered_signature() {
        let server = MockServer::start().await;
        let jwks_url = serve_jwks(&server, test_jwk_set("key-1")).await;

        let token = signed_token("client-1");
        let body_end = token.rfind('.').unwrap();
        let forged = format!(
            "{}.{}",
            &token[..body_end],
            URL_SAFE_NO_PAD.encode(b"forged-signature")
        );

        let err = verify_claims_jwks(
            &reqwest::Client::new(),
            &jwks_url,
            None,
            "client-1",
            &forged,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "claim_decode_failed");
    }

    #[tokio::test]
    async fn jwks_rejects_a_foreign_audience() {
        let server = MockServer::start().await;
        let jwks_url = serve_jwks(&server, test_jwk_set("key-1")).await;
        let token = signed_token("someone-elses-client");

        let err = verify_claims_jwks(
            &reqwest::Client::new(),
            &jwks_url,
            None,
            "client-1",
            &token,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "claim_decode_failed");
    }

    #[tokio::test]
    async fn jwks_rejects_an_unknown_kid() {
        let server = MockServer::start().await;
        let jwks_url = serve_jwks(&server, test_jwk_set("some-other-key")).await;
        let token = signed_token("client-1");

        let err = verify_claims_jwks(
            &reqwest::Client::new(),
            &jwks_url,
            None,
            "client-1",
            &token,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "claim_decode_failed");
    }

    #[tokio::test]
    async fn jwks_rejects_a_wrong_issuer() {
        let server = MockServer::start().await;
        let jwks_url = serve_jwks(&server, test_jwk_set("key-1")).await;
        let token = encode_hs256_jwt(
            "key-1",
            &json!({
                "sub": "abc123",
                "aud": "client-1",
                "iss": "https://rogue.example.com",
                "exp": 4_102_444_800u64,
            }),
        );

        let err = verify_claims_jwks(
            &reqwest::Client::new(),
            &jwks_url,
            Some("https://idp.example.com"),
            "client-1",
            &token,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "claim_decode_failed");
    }

    #[tokio::test]
    async fn stalled_jwks_endpoint_hits_the_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(test_jwk_set("key-1"))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;
        let jwks_url: Url = format!("{}/jwks.json", server.uri()).parse().unwrap();

        let err = verify_claims_jwks(
            &reqwest::Client::new(),
            &jwks_url,
            None,
            "client-1",
            &signed_token("client-1"),
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NetworkTimeout));
    }
}
