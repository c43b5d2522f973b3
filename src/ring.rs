//! Fixed-capacity bitmap spanning a ring buffer.
//!
//! Tracks set membership for a sliding window of monotonically increasing
//! sequence numbers. A number is addressable only while
//! `cursor - n < capacity`; outside that window every operation reports
//! "forgotten" (`None`) instead of silently answering false.
//!
//! All shared state lives in the atomic cursor and the atomic bit words. No
//! operation takes a lock; CAS retry loops against a single word are the only
//! synchronization.

use std::sync::atomic::{AtomicU64, Ordering};

const WORD_BITS: u64 = 64;

/// Minimum capacity, keeps word indexing branch-free.
const MIN_CAPACITY: u64 = 64;

/// Maximum capacity, caps the bitmap at 8 MiB and keeps the power-of-two
/// rounding from overflowing.
const MAX_CAPACITY: u64 = 1 << 26;

pub struct RingBitmap {
    cursor: AtomicU64,
    mask: u64,
    bits: Box<[AtomicU64]>,
}

impl RingBitmap {
    /// Create a ring with at least `capacity` slots.
    ///
    /// The requested size is rounded up to the next power of two, clamped
    /// to [64, 2^26].
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        let capacity = capacity
            .clamp(MIN_CAPACITY, MAX_CAPACITY)
            .next_power_of_two();
        let words = usize::try_from(capacity / WORD_BITS).unwrap_or(usize::MAX);
        let bits = (0..words).map(|_| AtomicU64::new(0)).collect();

        Self {
            cursor: AtomicU64::new(0),
            mask: capacity - 1,
            bits,
        }
    }

    /// Number of slots the ring remembers.
    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.mask + 1
    }

    /// Whether sequence number `n` is still inside the window.
    fn fits(&self, n: u64) -> bool {
        self.cursor.load(Ordering::SeqCst).wrapping_sub(n) <= self.mask
    }

    /// Claim the next sequence number.
    ///
    /// The bit at the claimed number's slot is cleared so the slot is ready
    /// for a later [`insert`](Self::insert), evicting whatever number
    /// occupied it a full window ago.
    pub fn advance(&self) -> u64 {
        let n = self.cursor.fetch_add(1, Ordering::SeqCst) + 1;

        let idx = n & self.mask;
        let word = &self.bits[word_index(idx)];
        let bit = 1u64 << (idx % WORD_BITS);
        loop {
            let old = word.load(Ordering::SeqCst);
            let new = old & !bit;
            if word
                .compare_exchange(old, new, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break;
            }
        }

        n
    }

    /// Whether `n` is marked, or `None` if the ring has forgotten it.
    #[must_use]
    pub fn contains(&self, n: u64) -> Option<bool> {
        if !self.fits(n) {
            return None;
        }
        let idx = n & self.mask;
        let word = self.bits[word_index(idx)].load(Ordering::SeqCst);
        Some(word & (1u64 << (idx % WORD_BITS)) != 0)
    }

    /// Mark `n`, reporting whether it was already marked.
    ///
    /// Returns `None` if the ring has forgotten `n`. When two callers race
    /// to mark the same number, exactly one observes `Some(false)`.
    #[must_use]
    pub fn insert(&self, n: u64) -> Option<bool> {
        if !self.fits(n) {
            return None;
        }
        let idx = n & self.mask;
        let word = &self.bits[word_index(idx)];
        let bit = 1u64 << (idx % WORD_BITS);
        loop {
            let old = word.load(Ordering::SeqCst);
            let new = old | bit;
            if word
                .compare_exchange(old, new, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Some(old & bit != 0);
            }
        }
    }
}

fn word_index(idx: u64) -> usize {
    usize::try_from(idx / WORD_BITS).unwrap_or(usize::MAX)
}
