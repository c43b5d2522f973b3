//! Secrets file bootstrap.
//!
//! The session signing key must survive restarts, so it lives in a small
//! JSON file next to the service. On first run the file is generated with a
//! fresh random key and mode 0600. The one-time-token MAC key is NOT stored:
//! it is regenerated every start on purpose, invalidating outstanding login
//! handshakes but never issued session credentials.

use anyhow::{bail, Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

pub const KEY_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct SecretsFile {
    session_key: String,
}

/// Secrets loaded from disk, key material wrapped until decode time.
pub struct Secrets {
    session_key: SecretString,
}

impl Secrets {
    /// Load the secrets file, generating it with a fresh key when absent.
    ///
    /// # Errors
    ///
    /// Returns an error on unreadable or malformed files, or when key
    /// generation or the initial write fails.
    pub fn load_or_generate(path: &Path) -> Result<Self> {
        if !path.exists() {
            generate(path)?;
            info!("Generated secrets file at {}", path.display());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read secrets file {}", path.display()))?;
        let file: SecretsFile = serde_json::from_str(&raw)
            .with_context(|| format!("malformed secrets file {}", path.display()))?;

        Ok(Self {
            session_key: SecretString::from(file.session_key),
        })
    }

    /// Decode the session signing key.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored key is not base64url or not exactly
    /// 32 bytes.
    pub fn session_key(&self) -> Result<[u8; KEY_LEN]> {
        let decoded = Base64UrlUnpadded::decode_vec(self.session_key.expose_secret())
            .context("session key is not valid base64url")?;

        let mut key = [0u8; KEY_LEN];
        if decoded.len() != KEY_LEN {
            bail!("session key must be {KEY_LEN} bytes, got {}", decoded.len());
        }
        key.copy_from_slice(&decoded);
        Ok(key)
    }
}

/// Generate a 256-bit key from the OS entropy source.
///
/// # Errors
///
/// Returns an error if the entropy source is unavailable; callers treat this
/// as fatal at startup.
pub fn random_key() -> Result<[u8; KEY_LEN]> {
    let mut key = [0u8; KEY_LEN];
    OsRng
        .try_fill_bytes(&mut key)
        .context("OS entropy source unavailable")?;
    Ok(key)
}

fn generate(path: &Path) -> Result<()> {
    let file = SecretsFile {
        session_key: Base64UrlUnpadded::encode_string(&random_key()?),
    };
    let json = serde_json::to_string_pretty(&file).context("failed to encode secrets")?;

    write_private(path, &json)
        .with_context(|| format!("failed to write secrets file {}", path.display()))?;
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    fs::write(path, contents)
}
