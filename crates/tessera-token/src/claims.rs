//! Token header and payload types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Signature algorithm identifier carried in every header.
pub const ALGORITHM: &str = "ECDSA";
/// Token type tag carried in every header.
pub const TOKEN_TYPE: &str = "JWT";

/// Open-ended application-defined claims.
pub type ClaimMap = HashMap<String, serde_json::Value>;

/// Token header: algorithm identifier and token-type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Signature algorithm (always `"ECDSA"`).
    pub alg: String,

    /// Token type tag (always `"JWT"`).
    pub typ: String,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        }
    }
}

/// Token payload. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Token identifier.
    #[serde(rename = "jti", default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,

    /// Intended audience.
    #[serde(rename = "aud", default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    /// Issuing party.
    #[serde(rename = "iss", default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Issuance instant.
    #[serde(rename = "iat", default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,

    /// Expiry instant.
    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    /// Not valid before this instant.
    #[serde(rename = "nbf", default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<i64>,

    /// Application-defined claims.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub claims: ClaimMap,
}

impl Payload {
    /// Whether the payload is expired when evaluated at `now_millis`.
    ///
    /// A payload without an expiry is treated as expired.
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now_millis,
            None => true,
        }
    }
}
