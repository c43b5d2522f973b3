//! Replay-protected one-time tokens for the login handshake.
//!
//! Issued tokens carry `"v0:" + base64url(mac ∥ sequence ∥ timestamp)` and
//! ride through the identity provider as the OAuth `state` value. Validation
//! and retirement are split in two: [`OneTime::check`] proves the token is
//! genuine, fresh and unused without burning it, so the caller can perform
//! the external code exchange in between; [`OneTime::consume`] finalizes once
//! the whole login succeeded. Consuming at check time would lock the user out
//! of retrying when the exchange transiently fails.

use crate::ring::RingBitmap;
use crate::unix_now;
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Version tag prepended to every issued token.
pub const VERSION_PREFIX: &str = "v0:";

/// Maximum token age in seconds, regardless of MAC validity.
pub const FRESHNESS_WINDOW_SECS: i64 = 30;

/// Default replay window; must exceed freshness window times peak issue rate.
pub const DEFAULT_RING_CAPACITY: u64 = 65536;

const MAC_LEN: usize = 32;

// mac ∥ sequence ∥ timestamp
const PAYLOAD_LEN: usize = MAC_LEN + 8 + 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OneTimeError {
    #[error("unsupported token version")]
    MalformedVersion,
    #[error("malformed v0 token")]
    MalformedEncoding,
    #[error("v0 token expired")]
    Expired,
    #[error("v0 token MAC invalid")]
    InvalidMac,
    #[error("v0 token no longer remembered")]
    OutOfWindow,
    #[error("v0 token reuse detected")]
    AlreadyUsed,
}

/// Issues and validates anti-replay one-time tokens.
///
/// Owns its MAC key exclusively; the key is generated fresh at startup and
/// never leaves the struct, so a restart invalidates all outstanding tokens.
pub struct OneTime {
    ring: RingBitmap,
    mac_key: [u8; 32],
}

impl OneTime {
    /// Build an issuer over a replay window of at least `capacity` slots.
    #[must_use]
    pub fn new(mac_key: [u8; 32], capacity: u64) -> Self {
        Self {
            ring: RingBitmap::new(capacity),
            mac_key,
        }
    }

    /// Issue a fresh token bound to the current wall clock.
    #[must_use]
    pub fn issue(&self) -> String {
        self.issue_at(unix_now())
    }

    /// Issue a fresh token stamped with an explicit Unix timestamp.
    #[must_use]
    pub fn issue_at(&self, now: i64) -> String {
        let mut payload = [0u8; PAYLOAD_LEN];

        let n = self.ring.advance();
        payload[32..40].copy_from_slice(&n.to_le_bytes());
        payload[40..48].copy_from_slice(&now.to_le_bytes());

        let mac = self.mac(&payload[32..48]);
        payload[..32].copy_from_slice(&mac);

        format!(
            "{VERSION_PREFIX}{}",
            Base64UrlUnpadded::encode_string(&payload)
        )
    }

    /// Validate a token without retiring it.
    ///
    /// On success returns the token's sequence number for a later
    /// [`consume`](Self::consume).
    ///
    /// # Errors
    ///
    /// Rejects tokens with an unknown version, malformed encoding, stale
    /// timestamp, bad MAC, a sequence number the ring has forgotten, or one
    /// that was already consumed.
    pub fn check(&self, token: &str) -> Result<u64, OneTimeError> {
        self.check_at(token, unix_now())
    }

    /// [`check`](Self::check) against an explicit Unix timestamp.
    ///
    /// # Errors
    ///
    /// Same rejections as [`check`](Self::check).
    pub fn check_at(&self, token: &str, now: i64) -> Result<u64, OneTimeError> {
        let encoded = token
            .strip_prefix(VERSION_PREFIX)
            .ok_or(OneTimeError::MalformedVersion)?;

        let payload =
            Base64UrlUnpadded::decode_vec(encoded).map_err(|_| OneTimeError::MalformedEncoding)?;
        if payload.len() != PAYLOAD_LEN {
            return Err(OneTimeError::MalformedEncoding);
        }

        let mut ts_bytes = [0u8; 8];
        ts_bytes.copy_from_slice(&payload[40..48]);
        // Saturate: the timestamp bytes are attacker-controlled and checked
        // before the MAC, so the subtraction must not overflow
        let timestamp = i64::from_le_bytes(ts_bytes);
        if now.saturating_sub(timestamp) > FRESHNESS_WINDOW_SECS {
            return Err(OneTimeError::Expired);
        }

        let mut mac = HmacSha256::new_from_slice(&self.mac_key)
            .map_err(|_| OneTimeError::InvalidMac)?;
        mac.update(&payload[32..48]);
        mac.verify_slice(&payload[..32])
            .map_err(|_| OneTimeError::InvalidMac)?;

        let mut seq_bytes = [0u8; 8];
        seq_bytes.copy_from_slice(&payload[32..40]);
        let n = u64::from_le_bytes(seq_bytes);

        match self.ring.contains(n) {
            None => Err(OneTimeError::OutOfWindow),
            Some(true) => Err(OneTimeError::AlreadyUsed),
            Some(false) => Ok(n),
        }
    }

    /// Permanently retire a sequence number returned by a successful check.
    ///
    /// # Errors
    ///
    /// Fails with `OutOfWindow` if the ring has since forgotten the number,
    /// or `AlreadyUsed` if a concurrent caller consumed it first.
    pub fn consume(&self, n: u64) -> Result<(), OneTimeError> {
        match self.ring.insert(n) {
            None => Err(OneTimeError::OutOfWindow),
            Some(true) => Err(OneTimeError::AlreadyUsed),
            Some(false) => Ok(()),
        }
    }

    fn mac(&self, data: &[u8]) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(&self.mac_key)
            .expect("HMAC accepts any key length");
        mac.update(data);
        mac.finalize().into_bytes().into()
    }
}
