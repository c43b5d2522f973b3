//! # Anteroom
//!
//! `anteroom` is a small access-control front-end that gates a shared server
//! behind third-party identity login. Its trust core is a replay-protected,
//! time-bounded one-time-token protocol defending the login handshake against
//! cross-site request forgery, plus a compact signed credential representing
//! an authenticated session.
//!
//! Layered leaves first:
//!
//! 1. [`ring`] — lock-free set membership over a sliding window of sequence
//!    numbers, no knowledge of tokens or crypto.
//! 2. [`onetime`] — anti-replay nonces (the OAuth `state` value), built on the
//!    ring and an HMAC.
//! 3. [`session`] — stateless signed bearer credentials with their own expiry,
//!    independent of the ring.
//!
//! Everything else (CLI, HTTP API, provider adapter) is wiring around those
//! three.

use std::time::{SystemTime, UNIX_EPOCH};

pub mod api;
pub mod cli;
pub mod onetime;
pub mod provider;
pub mod ring;
pub mod secrets;
pub mod session;

/// Seconds since the Unix epoch, clamped to zero if the clock is before it.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
