//! Compact signed session credentials.
//!
//! After a successful login the issuer mints an HS256-signed statement of the
//! verified identity, carried client-side in a cookie. Verification is a pure
//! function of the credential and the signing key; the server keeps no
//! session store and no revocation list, so a credential stays valid until
//! its embedded issuance time ages past the validity period or the key
//! rotates.

use crate::provider::Identity;
use crate::unix_now;
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Fixed HS256 header, base64url of `{"alg":"HS256","typ":"JWT"}` plus the
/// claims separator. Changing it is a wire-format version bump.
pub const HEADER: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.";

/// Credential validity in seconds (90 days).
pub const VALIDITY_SECS: i64 = 90 * 24 * 60 * 60;

const SIGNATURE_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid credential header")]
    BadHeader,
    #[error("invalid base64url encoding")]
    MalformedEncoding,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed claims")]
    MalformedClaims,
    #[error("credential expired")]
    Expired,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(with = "u64_string")]
    sub: u64,
    name: String,
    avatar: String,
    iat: i64,
}

// Subject ids exceed 2^53; encode them as JSON strings so decoders backed by
// IEEE doubles round-trip them intact.
mod u64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Stateless issuer/verifier for session credentials.
///
/// The signing key is supplied at construction (from the secrets file, so
/// credentials survive restarts) and never exposed.
pub struct Issuer {
    key: [u8; 32],
}

impl Issuer {
    #[must_use]
    pub const fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Mint a credential for a verified identity, stamped with the wall clock.
    #[must_use]
    pub fn issue(&self, ident: &Identity) -> String {
        self.issue_at(ident, unix_now())
    }

    /// Mint a credential with an explicit issuance timestamp.
    #[must_use]
    pub fn issue_at(&self, ident: &Identity, now: i64) -> String {
        let claims = Claims {
            sub: ident.id,
            name: ident.username.clone(),
            avatar: ident.avatar.clone(),
            iat: now,
        };

        // Claims are a flat struct of encodable fields; serialization cannot fail.
        let json = serde_json::to_vec(&claims).expect("claims serialize");
        let body = format!("{HEADER}{}", Base64UrlUnpadded::encode_string(&json));
        let signature = self.sign(&body);

        format!("{body}.{signature}")
    }

    /// Verify a credential against the wall clock.
    ///
    /// # Errors
    ///
    /// Rejects credentials with a foreign header, malformed encoding, a bad
    /// signature, undecodable claims, or an issuance time older than the
    /// validity period.
    pub fn verify(&self, credential: &str) -> Result<Identity, SessionError> {
        self.verify_at(credential, unix_now())
    }

    /// [`verify`](Self::verify) against an explicit Unix timestamp.
    ///
    /// # Errors
    ///
    /// Same rejections as [`verify`](Self::verify).
    pub fn verify_at(&self, credential: &str, now: i64) -> Result<Identity, SessionError> {
        if !credential.starts_with(HEADER) {
            return Err(SessionError::BadHeader);
        }

        let sig_sep = credential.rfind('.').ok_or(SessionError::BadHeader)?;
        if sig_sep < HEADER.len() {
            return Err(SessionError::BadHeader);
        }

        let signature = Base64UrlUnpadded::decode_vec(&credential[sig_sep + 1..])
            .map_err(|_| SessionError::MalformedEncoding)?;
        if signature.len() != SIGNATURE_LEN {
            return Err(SessionError::MalformedEncoding);
        }

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| SessionError::InvalidSignature)?;
        mac.update(credential[..sig_sep].as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::InvalidSignature)?;

        let claims_json = Base64UrlUnpadded::decode_vec(&credential[HEADER.len()..sig_sep])
            .map_err(|_| SessionError::MalformedEncoding)?;
        let claims: Claims =
            serde_json::from_slice(&claims_json).map_err(|_| SessionError::MalformedClaims)?;

        if now - claims.iat > VALIDITY_SECS {
            return Err(SessionError::Expired);
        }

        Ok(Identity {
            id: claims.sub,
            username: claims.name,
            avatar: claims.avatar,
        })
    }

    fn sign(&self, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(body.as_bytes());
        Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes())
    }
}
