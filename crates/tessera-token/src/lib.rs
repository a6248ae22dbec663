//! # tessera-token
//!
//! Self-contained P-256/ECDSA token primitive for Tessera services.
//!
//! This crate provides functionality for:
//! - Generating and persisting a P-256 key pair as armored key files
//! - Issuing signed, expiring tokens carrying arbitrary claims
//! - Verifying tokens and checking expiry as independent decisions
//! - Re-signing a verified token's claims under a fresh expiry
//!
//! ## Wire format
//!
//! A token is three dot-separated URL-safe base64 segments: a JSON header,
//! a JSON payload, and a JSON signature envelope carrying the SHA-256
//! digest that was signed plus the ECDSA `r`/`s` scalars. The format is
//! private to Tessera; it is deliberately not interoperable with standard
//! JWT validators.
//!
//! ## Trust boundaries
//!
//! [`TokenVerifier::verify`] is the only producer of [`VerifiedToken`], and
//! [`TokenIssuer::regenerate`] only accepts one, so re-signing unverified
//! claims is not expressible through this API. [`decode_unverified`] exists
//! for inspection and carries no trust.

pub mod claims;
pub mod config;
pub mod error;
pub mod keys;
pub mod token;

pub use claims::{ClaimMap, Header, Payload};
pub use config::KeyStoreConfig;
pub use error::{KeyError, TokenError};
pub use keys::ensure_key_pair;
pub use token::{
    decode_unverified, is_not_expired, is_not_expired_at, Token, TokenIssuer, TokenVerifier,
    VerifiedToken,
};
