//! Error types for key material and token operations.

use thiserror::Error;

/// Errors that can occur while generating, persisting, or loading keys.
#[derive(Debug, Error)]
pub enum KeyError {
    /// File-system failure while reading or writing key files.
    #[error("key file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The armor block is missing or carries the wrong label.
    #[error("failed to decode armor block: {0}")]
    Decode(String),

    /// The armored payload is not valid key material.
    #[error("failed to parse key material: {0}")]
    Parse(String),

    /// The file parsed, but the key inside is not an elliptic-curve key.
    #[error("not a P-256 key")]
    WrongKeyType,

    /// Key generation or serialization failed.
    #[error("key generation failed: {0}")]
    Crypto(String),

    /// Exactly one of the two key files exists.
    #[error("inconsistent key pair: {present} exists but {missing} is missing")]
    Inconsistent { present: String, missing: String },
}

/// Errors that can occur while issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The signing or verification keys could not be loaded.
    #[error("keys unavailable: {0}")]
    KeyUnavailable(#[from] KeyError),

    /// Serializing a token segment failed.
    #[error("token encoding failed: {0}")]
    Encoding(String),

    /// The ECDSA signing operation failed.
    #[error("signing failed: {0}")]
    Crypto(String),

    /// The token is not a well-formed three-segment wire string.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The stored digest does not match the digest recomputed from the
    /// header and payload segments.
    #[error("token digest does not match header and payload")]
    DigestMismatch,

    /// The signature does not verify against the public key.
    #[error("signature verification failed")]
    InvalidSignature,

    /// The verifier accepted a deliberately corrupted digest.
    #[error("verifier accepted a corrupted digest")]
    VerificationAlwaysTrue,

    /// A freshly produced signature failed immediate self-verification.
    #[error("freshly signed token failed self-verification")]
    SigningIntegrityFailure,
}
