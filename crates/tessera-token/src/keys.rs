//! Key pair generation, persistence, and loading.
//!
//! Keys are persisted as two PEM armor blocks: the private key as SEC1
//! `ECPrivateKey` DER under the `E256 PRIVATE KEY` label, the public key as
//! SubjectPublicKeyInfo DER under `E256 PUBLIC KEY`. The pair is created
//! together or not at all, and existing material is never overwritten.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::pkcs8::der::asn1::ObjectIdentifier;
use p256::pkcs8::der::{Decode, Encode};
use p256::pkcs8::spki::SubjectPublicKeyInfoRef;
use p256::pkcs8::{DecodePublicKey, EncodePublicKey};
use p256::{PublicKey, SecretKey};
use rand_core::OsRng;
use x509_cert::Certificate;

use crate::config::KeyStoreConfig;
use crate::error::KeyError;

/// Armor label for the private key file.
pub const PRIVATE_KEY_LABEL: &str = "E256 PRIVATE KEY";
/// Armor label for the public key file.
pub const PUBLIC_KEY_LABEL: &str = "E256 PUBLIC KEY";

/// id-ecPublicKey; any other SubjectPublicKeyInfo algorithm is rejected.
const EC_PUBLIC_KEY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

// Serializes first-run generation within the process; create_new opens keep
// racing processes from truncating each other's files.
static GENERATION_GUARD: Mutex<()> = Mutex::new(());

/// Generate the key pair at the configured paths if neither file exists.
///
/// Both files are written together. If both already exist the call is a
/// no-op; if exactly one exists the pair is inconsistent and the call fails
/// without touching either file.
pub fn ensure_key_pair(config: &KeyStoreConfig) -> Result<(), KeyError> {
    let _guard = GENERATION_GUARD.lock().unwrap();

    let private_exists = config.private_key_path.exists();
    let public_exists = config.public_key_path.exists();

    match (private_exists, public_exists) {
        (true, true) => Ok(()),
        (false, false) => generate_key_pair(config),
        (true, false) => Err(KeyError::Inconsistent {
            present: config.private_key_path.display().to_string(),
            missing: config.public_key_path.display().to_string(),
        }),
        (false, true) => Err(KeyError::Inconsistent {
            present: config.public_key_path.display().to_string(),
            missing: config.private_key_path.display().to_string(),
        }),
    }
}

fn generate_key_pair(config: &KeyStoreConfig) -> Result<(), KeyError> {
    let secret = SecretKey::random(&mut OsRng);
    let public = secret.public_key();

    let private_der = secret
        .to_sec1_der()
        .map_err(|e| KeyError::Crypto(e.to_string()))?;
    let public_der = public
        .to_public_key_der()
        .map_err(|e| KeyError::Crypto(e.to_string()))?;

    let private_pem = pem::encode(&pem::Pem::new(PRIVATE_KEY_LABEL, private_der.to_vec()));
    let public_pem = pem::encode(&pem::Pem::new(PUBLIC_KEY_LABEL, public_der.as_bytes().to_vec()));

    write_new(&config.private_key_path, private_pem.as_bytes())?;
    write_new(&config.public_key_path, public_pem.as_bytes())?;

    tracing::info!(
        private = %config.private_key_path.display(),
        public = %config.public_key_path.display(),
        "generated P-256 key pair"
    );
    Ok(())
}

// create_new refuses to truncate a file another process wrote between the
// existence check and this open.
fn write_new(path: &Path, contents: &[u8]) -> Result<(), KeyError> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(contents)?;
    Ok(())
}

/// Load and parse the armored private key at `path`.
pub fn load_private_key(path: &Path) -> Result<SigningKey, KeyError> {
    let data = fs::read(path)?;
    let block = pem::parse(&data).map_err(|e| KeyError::Decode(e.to_string()))?;
    if block.tag() != PRIVATE_KEY_LABEL {
        return Err(KeyError::Decode(format!(
            "expected armor label '{PRIVATE_KEY_LABEL}', found '{}'",
            block.tag()
        )));
    }

    let secret =
        SecretKey::from_sec1_der(block.contents()).map_err(|e| KeyError::Parse(e.to_string()))?;
    Ok(SigningKey::from(secret))
}

/// Load and parse the armored public key at `path`.
///
/// The armor payload is normally a SubjectPublicKeyInfo block; a certificate
/// is also accepted, in which case its embedded public key is extracted.
pub fn load_public_key(path: &Path) -> Result<VerifyingKey, KeyError> {
    let data = fs::read(path)?;
    let block = pem::parse(&data).map_err(|e| KeyError::Decode(e.to_string()))?;
    if block.tag() != PUBLIC_KEY_LABEL {
        return Err(KeyError::Decode(format!(
            "expected armor label '{PUBLIC_KEY_LABEL}', found '{}'",
            block.tag()
        )));
    }

    let spki_der = match SubjectPublicKeyInfoRef::from_der(block.contents()) {
        Ok(_) => block.contents().to_vec(),
        // Not a bare key; accept a certificate carrying one.
        Err(_) => {
            let cert = Certificate::from_der(block.contents())
                .map_err(|e| KeyError::Parse(e.to_string()))?;
            cert.tbs_certificate
                .subject_public_key_info
                .to_der()
                .map_err(|e| KeyError::Parse(e.to_string()))?
        }
    };

    let spki =
        SubjectPublicKeyInfoRef::from_der(&spki_der).map_err(|e| KeyError::Parse(e.to_string()))?;
    if spki.algorithm.oid != EC_PUBLIC_KEY_OID {
        return Err(KeyError::WrongKeyType);
    }

    let public =
        PublicKey::from_public_key_der(&spki_der).map_err(|e| KeyError::Parse(e.to_string()))?;
    Ok(VerifyingKey::from(&public))
}
