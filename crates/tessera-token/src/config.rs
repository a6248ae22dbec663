//! Key store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the private key file.
pub const PRIVATE_KEY_PATH_ENV: &str = "TESSERA_PRIVATE_KEY_PATH";
/// Environment variable naming the public key file.
pub const PUBLIC_KEY_PATH_ENV: &str = "TESSERA_PUBLIC_KEY_PATH";

const DEFAULT_PRIVATE_KEY_PATH: &str = "keys/private.pem";
const DEFAULT_PUBLIC_KEY_PATH: &str = "keys/public.pem";

/// Locations of the persisted key pair.
///
/// Passed explicitly to every key store and token operation; there is no
/// process-wide key configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyStoreConfig {
    /// Path to the armored private key file.
    pub private_key_path: PathBuf,

    /// Path to the armored public key file.
    pub public_key_path: PathBuf,
}

impl KeyStoreConfig {
    /// Create a config from explicit paths.
    pub fn new(
        private_key_path: impl Into<PathBuf>,
        public_key_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            private_key_path: private_key_path.into(),
            public_key_path: public_key_path.into(),
        }
    }

    /// Read paths from `TESSERA_PRIVATE_KEY_PATH` / `TESSERA_PUBLIC_KEY_PATH`,
    /// falling back to `keys/private.pem` and `keys/public.pem`.
    pub fn from_env() -> Self {
        let private = std::env::var(PRIVATE_KEY_PATH_ENV)
            .unwrap_or_else(|_| DEFAULT_PRIVATE_KEY_PATH.to_string());
        let public = std::env::var(PUBLIC_KEY_PATH_ENV)
            .unwrap_or_else(|_| DEFAULT_PUBLIC_KEY_PATH.to_string());
        Self::new(private, public)
    }
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PRIVATE_KEY_PATH, DEFAULT_PUBLIC_KEY_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_paths() {
        let config = KeyStoreConfig::new("/tmp/a.pem", "/tmp/b.pem");
        assert_eq!(config.private_key_path, PathBuf::from("/tmp/a.pem"));
        assert_eq!(config.public_key_path, PathBuf::from("/tmp/b.pem"));
    }

    #[test]
    fn test_default_paths() {
        let config = KeyStoreConfig::default();
        assert_eq!(config.private_key_path, PathBuf::from("keys/private.pem"));
        assert_eq!(config.public_key_path, PathBuf::from("keys/public.pem"));
    }
}
