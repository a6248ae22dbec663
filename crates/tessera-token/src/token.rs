//! Token issuance, verification, and the signed-envelope wire codec.
//!
//! A wire token is three dot-separated segments, each a URL-safe base64
//! JSON document: header, payload, and a signature envelope holding the
//! SHA-256 digest that was signed together with the ECDSA `r`/`s` scalars.
//! The digest covers the UTF-8 bytes of `"<encoded header>.<encoded
//! payload>"` exactly as they appear on the wire, so any edit to either
//! segment is caught by a digest comparison before the signature is
//! consulted.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::Signature;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::claims::{ClaimMap, Header, Payload};
use crate::config::KeyStoreConfig;
use crate::error::TokenError;
use crate::keys;

/// Signature segment as it appears on the wire: the digest that was signed
/// and the two ECDSA signature scalars, all hex-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureEnvelope {
    /// SHA-256 digest of `"<encoded header>.<encoded payload>"`.
    pub hashed: String,
    /// Big-endian `r` scalar.
    pub r: String,
    /// Big-endian `s` scalar.
    pub s: String,
}

impl SignatureEnvelope {
    fn to_signature(&self) -> Result<Signature, TokenError> {
        let r = decode_hex32(&self.r)?;
        let s = decode_hex32(&self.s)?;
        Signature::from_scalars(r, s).map_err(|_| TokenError::InvalidSignature)
    }
}

/// A fully parsed token, with no trust decision attached.
#[derive(Debug, Clone)]
pub struct Token {
    pub header: Header,
    pub payload: Payload,
    pub signature: SignatureEnvelope,
}

/// A token whose digest and signature have been checked.
///
/// Only [`TokenVerifier::verify`] produces these, which makes
/// verify-then-regenerate the only way to re-sign existing claims.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    header: Header,
    payload: Payload,
}

impl VerifiedToken {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The application-defined claims carried by the token.
    pub fn claims(&self) -> &ClaimMap {
        &self.payload.claims
    }
}

/// Issues signed tokens against a configured key pair.
pub struct TokenIssuer {
    config: KeyStoreConfig,
}

impl TokenIssuer {
    pub fn new(config: KeyStoreConfig) -> Self {
        Self { config }
    }

    /// Mint a signed token for `audience`/`issuer` expiring `ttl_millis`
    /// from now.
    pub fn issue(
        &self,
        audience: &str,
        issuer: &str,
        ttl_millis: i64,
        claims: Option<ClaimMap>,
    ) -> Result<String, TokenError> {
        let now = Utc::now().timestamp_millis();
        let payload = Payload {
            audience: Some(audience.to_string()),
            issuer: Some(issuer.to_string()),
            issued_at: Some(now),
            expires_at: Some(now + ttl_millis),
            claims: claims.unwrap_or_default(),
            ..Payload::default()
        };
        self.sign(Header::default(), payload)
    }

    /// Re-sign a verified token's claims under fresh timestamps.
    pub fn regenerate(
        &self,
        audience: &str,
        issuer: &str,
        ttl_millis: i64,
        token: &VerifiedToken,
    ) -> Result<String, TokenError> {
        self.issue(audience, issuer, ttl_millis, Some(token.claims().clone()))
    }

    fn sign(&self, header: Header, payload: Payload) -> Result<String, TokenError> {
        let signing_key = keys::load_private_key(&self.config.private_key_path)?;
        let verifying_key = keys::load_public_key(&self.config.public_key_path)?;

        let encoded_header = encode_segment(&header)?;
        let encoded_payload = encode_segment(&payload)?;
        let digest = signing_digest(&encoded_header, &encoded_payload);

        let signature: Signature = signing_key
            .sign_prehash(&digest)
            .map_err(|e| TokenError::Crypto(e.to_string()))?;

        // A signature we cannot verify ourselves must never leave this
        // function.
        verifying_key
            .verify_prehash(&digest, &signature)
            .map_err(|_| TokenError::SigningIntegrityFailure)?;

        let (r, s) = signature.split_bytes();
        let envelope = SignatureEnvelope {
            hashed: hex::encode(digest),
            r: hex::encode(r),
            s: hex::encode(s),
        };
        let encoded_signature = encode_segment(&envelope)?;

        tracing::debug!(
            audience = ?payload.audience,
            issuer = ?payload.issuer,
            expires_at = ?payload.expires_at,
            "issued token"
        );
        Ok(format!("{encoded_header}.{encoded_payload}.{encoded_signature}"))
    }
}

/// Verifies wire tokens against a configured public key.
pub struct TokenVerifier {
    config: KeyStoreConfig,
}

impl TokenVerifier {
    pub fn new(config: KeyStoreConfig) -> Self {
        Self { config }
    }

    /// Check a wire token's digest and signature, returning its decoded
    /// contents.
    ///
    /// Expiry is an independent check; see [`is_not_expired`].
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let (header_seg, payload_seg, signature_seg) = split_segments(token)?;

        let recomputed = signing_digest(header_seg, payload_seg);
        let envelope: SignatureEnvelope = decode_segment(signature_seg)?;
        let stored = decode_hex32(&envelope.hashed)?;
        if stored != recomputed {
            return Err(TokenError::DigestMismatch);
        }

        let signature = envelope.to_signature()?;
        let verifying_key = keys::load_public_key(&self.config.public_key_path)?;
        verifying_key
            .verify_prehash(&stored, &signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        // Sanity assertion against a broken verifier backend: a corrupted
        // digest must not verify. Internal invariant only, not part of the
        // trust decision on `token`.
        #[cfg(debug_assertions)]
        {
            let mut corrupted = stored;
            corrupted[0] ^= 0xff;
            if verifying_key.verify_prehash(&corrupted, &signature).is_ok() {
                return Err(TokenError::VerificationAlwaysTrue);
            }
        }

        Ok(VerifiedToken {
            header: decode_segment(header_seg)?,
            payload: decode_segment(payload_seg)?,
        })
    }
}

/// Whether the token's expiry lies in the future.
///
/// An expired token is `Ok(false)`, not an error; decode failures are
/// [`TokenError::Malformed`].
pub fn is_not_expired(token: &str) -> Result<bool, TokenError> {
    is_not_expired_at(token, Utc::now().timestamp_millis())
}

/// [`is_not_expired`] evaluated at a caller-supplied instant.
pub fn is_not_expired_at(token: &str, now_millis: i64) -> Result<bool, TokenError> {
    let (_, payload_seg, _) = split_segments(token)?;
    let payload: Payload = decode_segment(payload_seg)?;
    Ok(!payload.is_expired_at(now_millis))
}

/// Parse all three segments of a wire token without checking anything.
///
/// The result carries no trust: call [`TokenVerifier::verify`] before acting
/// on the contents.
pub fn decode_unverified(token: &str) -> Result<Token, TokenError> {
    let (header_seg, payload_seg, signature_seg) = split_segments(token)?;
    Ok(Token {
        header: decode_segment(header_seg)?,
        payload: decode_segment(payload_seg)?,
        signature: decode_segment(signature_seg)?,
    })
}

fn split_segments(token: &str) -> Result<(&str, &str, &str), TokenError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok((header, payload, signature)),
        _ => Err(TokenError::Malformed(
            "expected exactly three dot-separated segments".to_string(),
        )),
    }
}

fn signing_digest(encoded_header: &str, encoded_payload: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(encoded_header.as_bytes());
    hasher.update(b".");
    hasher.update(encoded_payload.as_bytes());
    hasher.finalize().into()
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|e| TokenError::Encoding(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let json = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(e.to_string()))?;
    serde_json::from_slice(&json).map_err(|e| TokenError::Malformed(e.to_string()))
}

fn decode_hex32(hex_str: &str) -> Result<[u8; 32], TokenError> {
    let bytes = hex::decode(hex_str).map_err(|e| TokenError::Malformed(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| TokenError::Malformed("expected 32 bytes".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::ensure_key_pair;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, KeyStoreConfig) {
        let dir = tempdir().unwrap();
        let config = KeyStoreConfig::new(
            dir.path().join("private.pem"),
            dir.path().join("public.pem"),
        );
        ensure_key_pair(&config).unwrap();
        (dir, config)
    }

    fn claims(entries: &[(&str, serde_json::Value)]) -> ClaimMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let (_dir, config) = setup();
        let issuer = TokenIssuer::new(config.clone());
        let verifier = TokenVerifier::new(config);

        let token = issuer
            .issue("svc-a", "auth", 60_000, Some(claims(&[("uid", json!("42"))])))
            .unwrap();

        let verified = verifier.verify(&token).unwrap();
        assert_eq!(verified.header().alg, "ECDSA");
        assert_eq!(verified.payload().audience.as_deref(), Some("svc-a"));
        assert_eq!(verified.payload().issuer.as_deref(), Some("auth"));
        assert_eq!(verified.claims().get("uid"), Some(&json!("42")));
        assert!(is_not_expired(&token).unwrap());
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let (_dir, config) = setup();
        let issuer = TokenIssuer::new(config.clone());
        let verifier = TokenVerifier::new(config);

        let token = issuer
            .issue("svc-a", "auth", 60_000, Some(claims(&[("role", json!("user"))])))
            .unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut payload = parts[1].clone().into_bytes();
        payload[0] = if payload[0] == b'A' { b'B' } else { b'A' };
        parts[1] = String::from_utf8(payload).unwrap();
        let tampered = parts.join(".");

        let err = verifier.verify(&tampered).unwrap_err();
        assert!(matches!(
            err,
            TokenError::DigestMismatch | TokenError::InvalidSignature
        ));
    }

    #[test]
    fn test_spliced_signature_is_rejected() {
        let (_dir, config) = setup();
        let issuer = TokenIssuer::new(config.clone());
        let verifier = TokenVerifier::new(config);

        let token_a = issuer.issue("svc-a", "auth", 60_000, None).unwrap();
        let token_b = issuer
            .issue("svc-b", "auth", 60_000, Some(claims(&[("x", json!(1))])))
            .unwrap();

        // Envelope whose digest matches token A but whose scalars signed
        // token B: passes the digest comparison, fails verification.
        let a = decode_unverified(&token_a).unwrap();
        let b = decode_unverified(&token_b).unwrap();
        let forged = SignatureEnvelope {
            hashed: a.signature.hashed.clone(),
            r: b.signature.r.clone(),
            s: b.signature.s.clone(),
        };
        let parts: Vec<&str> = token_a.split('.').collect();
        let forged_token = format!(
            "{}.{}.{}",
            parts[0],
            parts[1],
            encode_segment(&forged).unwrap()
        );

        let err = verifier.verify(&forged_token).unwrap_err();
        assert!(matches!(err, TokenError::InvalidSignature));
    }

    #[test]
    fn test_zero_ttl_token_expires_immediately_but_verifies() {
        let (_dir, config) = setup();
        let issuer = TokenIssuer::new(config.clone());
        let verifier = TokenVerifier::new(config);

        let token = issuer.issue("svc-a", "auth", 0, None).unwrap();

        assert!(!is_not_expired(&token).unwrap());
        verifier.verify(&token).unwrap();
    }

    #[test]
    fn test_regenerate_preserves_claims_with_fresh_timestamps() {
        let (_dir, config) = setup();
        let issuer = TokenIssuer::new(config.clone());
        let verifier = TokenVerifier::new(config);

        let original = issuer
            .issue(
                "svc-a",
                "auth",
                60_000,
                Some(claims(&[("role", json!("admin"))])),
            )
            .unwrap();
        let original_payload = verifier.verify(&original).unwrap().payload().clone();

        std::thread::sleep(std::time::Duration::from_millis(5));

        let verified = verifier.verify(&original).unwrap();
        let renewed = issuer
            .regenerate("svc-a", "auth", 60_000, &verified)
            .unwrap();
        let renewed_payload = verifier.verify(&renewed).unwrap().payload().clone();

        assert_eq!(renewed_payload.claims, original_payload.claims);
        assert_eq!(renewed_payload.claims.get("role"), Some(&json!("admin")));
        assert!(renewed_payload.issued_at.unwrap() > original_payload.issued_at.unwrap());
        assert!(renewed_payload.expires_at.unwrap() > original_payload.expires_at.unwrap());
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let (_dir, config) = setup();
        let verifier = TokenVerifier::new(config);

        for input in ["", "onlyone", "two.segments", "a.b.c.d"] {
            let err = verifier.verify(input).unwrap_err();
            assert!(matches!(err, TokenError::Malformed(_)), "input: {input:?}");
        }
        assert!(matches!(
            is_not_expired("two.segments"),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_foreign_key_pair_is_rejected() {
        let (_dir_a, config_a) = setup();
        let (_dir_b, config_b) = setup();

        let token = TokenIssuer::new(config_a)
            .issue("svc-a", "auth", 60_000, None)
            .unwrap();
        let err = TokenVerifier::new(config_b).verify(&token).unwrap_err();
        assert!(matches!(err, TokenError::InvalidSignature));
    }

    #[test]
    fn test_issue_verify_expire_scenario() {
        let (_dir, config) = setup();
        let issuer = TokenIssuer::new(config.clone());
        let verifier = TokenVerifier::new(config);

        let token = issuer
            .issue("svc-a", "auth", 60_000, Some(claims(&[("uid", json!("42"))])))
            .unwrap();

        verifier.verify(&token).unwrap();
        assert!(is_not_expired(&token).unwrap());

        // Past the ttl the token is expired while its signature stays valid.
        let issued_at = decode_unverified(&token).unwrap().payload.issued_at.unwrap();
        assert!(!is_not_expired_at(&token, issued_at + 60_001).unwrap());
        verifier.verify(&token).unwrap();
    }
}
