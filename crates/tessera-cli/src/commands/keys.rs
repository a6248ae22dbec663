//! Key management commands.
//!
//! `tessera keys generate` - Create the P-256 key pair files.

use anyhow::Context;
use std::fs;
use std::path::PathBuf;
use tessera_token::{ensure_key_pair, KeyStoreConfig};

/// Generate the key pair at the given paths if neither file exists.
pub fn generate(private: PathBuf, public: PathBuf) -> anyhow::Result<()> {
    for path in [&private, &public] {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
    }

    let config = KeyStoreConfig::new(private, public);
    ensure_key_pair(&config).context("Failed to generate key pair")?;

    println!("✔ Key pair ready:");
    println!("  Private key: {}", config.private_key_path.display());
    println!("  Public key:  {}", config.public_key_path.display());
    println!();
    println!("⚠️  Keep the private key secure! Never commit it to version control.");

    Ok(())
}
