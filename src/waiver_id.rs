//! Waiver identifiers: a fixed prefix plus characters drawn from an
//! alphabet without look-alikes (no I, L, O, U).

use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};
use tracing::debug;

use crate::error::{Result, WaiverError};

pub const WAIVER_ID_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
pub const WAIVER_ID_PREFIX: &str = "PAS-";
pub const WAIVER_ID_LENGTH: usize = 10;

/// Attempts made by [`allocate_waiver_id`] before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 5;

pub struct WaiverIdGenerator<R> {
    rng: R,
    prefix: String,
    length: usize,
}

impl WaiverIdGenerator<OsRng> {
    pub fn new() -> Self {
        Self::with_rng(OsRng)
    }
}

impl Default for WaiverIdGenerator<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + CryptoRng> WaiverIdGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            prefix: WAIVER_ID_PREFIX.to_string(),
            length: WAIVER_ID_LENGTH,
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn generate(&mut self) -> String {
        let mut id = String::with_capacity(self.prefix.len() + self.length);
        id.push_str(&self.prefix);
        for _ in 0..self.length {
            let index = self.rng.gen_range(0..WAIVER_ID_ALPHABET.len());
            id.push(WAIVER_ID_ALPHABET[index] as char);
        }
        id
    }

    /// Generates IDs until `is_taken` reports a free one.
    ///
    /// Errors from `is_taken` propagate unchanged. After
    /// [`MAX_ALLOCATION_ATTEMPTS`] collisions the allocation fails with
    /// [`WaiverError::IdSpaceExhausted`].
    pub fn allocate<F>(&mut self, mut is_taken: F) -> Result<String>
    where
        F: FnMut(&str) -> Result<bool>,
    {
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let id = self.generate();
            if !is_taken(&id)? {
                return Ok(id);
            }
            debug!(attempt, id = %id, "waiver id collision");
        }
        Err(WaiverError::IdSpaceExhausted {
            attempts: MAX_ALLOCATION_ATTEMPTS,
        })
    }
}

/// A fresh `PAS-` ID from the operating system's secure random source.
pub fn generate_waiver_id() -> String {
    WaiverIdGenerator::new().generate()
}

pub fn allocate_waiver_id<F>(is_taken: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    WaiverIdGenerator::new().allocate(is_taken)
}
