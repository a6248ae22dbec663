//! Token management commands.
//!
//! `tessera token issue` - Mint a signed token.
//! `tessera token verify` - Verify a token's digest and signature.
//! `tessera token inspect` - Decode a token without verification.
//! `tessera token renew` - Verify a token and re-sign its claims.

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tessera_token::{
    decode_unverified, is_not_expired, ClaimMap, KeyStoreConfig, TokenIssuer, TokenVerifier,
};

/// Accept a token either inline or as a path to a file containing one.
fn resolve_token(token: &str) -> anyhow::Result<String> {
    let path = Path::new(token);
    if path.exists() {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read token file: {}", path.display()))?;
        return Ok(contents.trim().to_string());
    }
    Ok(token.to_string())
}

/// Parse a ttl string like "90s", "30m", "24h", "7d", or bare milliseconds.
fn parse_ttl_millis(s: &str) -> anyhow::Result<i64> {
    let s = s.trim().to_lowercase();

    if let Some(hours) = s.strip_suffix('h') {
        let h: i64 = hours.parse()?;
        return Ok(chrono::Duration::hours(h).num_milliseconds());
    }
    if let Some(days) = s.strip_suffix('d') {
        let d: i64 = days.parse()?;
        return Ok(chrono::Duration::days(d).num_milliseconds());
    }
    if let Some(minutes) = s.strip_suffix('m') {
        let m: i64 = minutes.parse()?;
        return Ok(chrono::Duration::minutes(m).num_milliseconds());
    }
    if let Some(seconds) = s.strip_suffix('s') {
        let sec: i64 = seconds.parse()?;
        return Ok(chrono::Duration::seconds(sec).num_milliseconds());
    }

    // No suffix: bare milliseconds.
    Ok(s.parse()?)
}

/// Parse repeated `key=value` claim flags; values that parse as JSON become
/// typed values, anything else stays a string.
fn parse_claims(specs: Vec<String>) -> anyhow::Result<Option<ClaimMap>> {
    if specs.is_empty() {
        return Ok(None);
    }

    let mut claims = ClaimMap::new();
    for spec in specs {
        let (key, value) = spec
            .split_once('=')
            .with_context(|| format!("Claim '{spec}' is not in key=value form"))?;
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        claims.insert(key.to_string(), value);
    }
    Ok(Some(claims))
}

/// Mint a signed token.
pub fn issue(
    private: PathBuf,
    public: PathBuf,
    audience: &str,
    issuer: &str,
    ttl: &str,
    claim_specs: Vec<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let ttl_millis = parse_ttl_millis(ttl)?;
    let claims = parse_claims(claim_specs)?;

    let config = KeyStoreConfig::new(private, public);
    let token = TokenIssuer::new(config)
        .issue(audience, issuer, ttl_millis, claims)
        .context("Failed to issue token")?;

    if let Some(output_path) = output {
        fs::write(&output_path, &token)?;
        println!("✔ Token written to: {}", output_path.display());
        println!("  Audience: {audience}");
        println!("  Issuer:   {issuer}");
        println!("  TTL:      {ttl_millis}ms");
    } else {
        println!("{token}");
    }

    Ok(())
}

/// Verify a token and print its contents, or exit nonzero.
pub fn verify(private: PathBuf, public: PathBuf, token: &str) -> anyhow::Result<()> {
    let token = resolve_token(token)?;
    let config = KeyStoreConfig::new(private, public);

    match TokenVerifier::new(config).verify(&token) {
        Ok(verified) => {
            let live = is_not_expired(&token)?;
            println!("✔ Token is authentic");
            println!();
            println!("Token Details:");
            if let Some(aud) = &verified.payload().audience {
                println!("  Audience: {aud}");
            }
            if let Some(iss) = &verified.payload().issuer {
                println!("  Issuer:   {iss}");
            }
            println!("  Expired:  {}", if live { "no" } else { "yes" });
            if !verified.claims().is_empty() {
                println!("  Claims:   {}", serde_json::to_string(verified.claims())?);
            }
        }
        Err(e) => {
            println!("✖ Token verification failed: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Decode a token without verifying it.
pub fn inspect(token: &str) -> anyhow::Result<()> {
    let token = resolve_token(token)?;
    let decoded = decode_unverified(&token)?;

    println!("Token contents (NOT verified):");
    println!("  Header:  {}", serde_json::to_string(&decoded.header)?);
    println!("  Payload: {}", serde_json::to_string_pretty(&decoded.payload)?);

    Ok(())
}

/// Verify a token, then re-sign its claims under a fresh expiry.
pub fn renew(
    private: PathBuf,
    public: PathBuf,
    token: &str,
    audience: &str,
    issuer: &str,
    ttl: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let token = resolve_token(token)?;
    let ttl_millis = parse_ttl_millis(ttl)?;
    let config = KeyStoreConfig::new(private, public);

    let verified = TokenVerifier::new(config.clone())
        .verify(&token)
        .context("Refusing to renew: token does not verify")?;

    let renewed = TokenIssuer::new(config)
        .regenerate(audience, issuer, ttl_millis, &verified)
        .context("Failed to renew token")?;

    if let Some(output_path) = output {
        fs::write(&output_path, &renewed)?;
        println!("✔ Renewed token written to: {}", output_path.display());
    } else {
        println!("{renewed}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::keys;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_parse_ttl_millis() {
        assert_eq!(parse_ttl_millis("90s").unwrap(), 90_000);
        assert_eq!(parse_ttl_millis("30m").unwrap(), 1_800_000);
        assert_eq!(parse_ttl_millis("24h").unwrap(), 86_400_000);
        assert_eq!(parse_ttl_millis("7d").unwrap(), 604_800_000);
        assert_eq!(parse_ttl_millis("250").unwrap(), 250);
    }

    #[test]
    fn test_parse_claims_json_and_string_values() {
        let claims = parse_claims(vec!["uid=42".into(), "name=alice".into()])
            .unwrap()
            .unwrap();
        assert_eq!(claims.get("uid"), Some(&json!(42)));
        assert_eq!(claims.get("name"), Some(&json!("alice")));

        assert!(parse_claims(vec![]).unwrap().is_none());
        assert!(parse_claims(vec!["no-separator".into()]).is_err());
    }

    #[test]
    fn test_issue_then_verify_round_trip() {
        let dir = tempdir().unwrap();
        let private = dir.path().join("private.pem");
        let public = dir.path().join("public.pem");
        let token_path = dir.path().join("token.txt");

        keys::generate(private.clone(), public.clone()).unwrap();

        issue(
            private.clone(),
            public.clone(),
            "svc-a",
            "auth",
            "1h",
            vec!["uid=42".to_string()],
            Some(token_path.clone()),
        )
        .unwrap();

        assert!(token_path.exists());
        verify(private, public, token_path.to_str().unwrap()).unwrap();
    }

    #[test]
    fn test_renew_produces_verifiable_token() {
        let dir = tempdir().unwrap();
        let private = dir.path().join("private.pem");
        let public = dir.path().join("public.pem");
        let token_path = dir.path().join("token.txt");
        let renewed_path = dir.path().join("renewed.txt");

        keys::generate(private.clone(), public.clone()).unwrap();
        issue(
            private.clone(),
            public.clone(),
            "svc-a",
            "auth",
            "1h",
            vec!["role=admin".to_string()],
            Some(token_path.clone()),
        )
        .unwrap();

        renew(
            private.clone(),
            public.clone(),
            token_path.to_str().unwrap(),
            "svc-a",
            "auth",
            "2h",
            Some(renewed_path.clone()),
        )
        .unwrap();

        verify(private, public, renewed_path.to_str().unwrap()).unwrap();
    }
}
