//! Request nonces
//!
//! Nonces come from a counter seeded once from the system's secure random
//! source. Every signer in the process shares one [`NonceGenerator`], so
//! two requests signed in the same second still carry different nonces.

use crate::error::{Error, Result};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::{Mutex, PoisonError};

/// Hands out unique nonces as lowercase hex.
pub struct NonceGenerator {
    counter: Mutex<Option<u64>>,
    rng: SystemRandom,
}

impl NonceGenerator {
    /// A generator that seeds itself on first use.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: Mutex::new(None),
            rng: SystemRandom::new(),
        }
    }

    /// A generator whose first nonce is `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            counter: Mutex::new(Some(seed)),
            rng: SystemRandom::new(),
        }
    }

    /// The next nonce.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Random`] if the generator is not yet seeded and the
    /// random source fails. A later call retries the seeding.
    pub fn next_nonce(&self) -> Result<String> {
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        let value = match *counter {
            Some(value) => value,
            None => self.seed()?,
        };
        *counter = Some(value.wrapping_add(1));
        Ok(format!("{value:x}"))
    }

    fn seed(&self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        self.rng.fill(&mut bytes).map_err(|_| Error::Random)?;
        Ok(u64::from_be_bytes(bytes))
    }
}

impl Default for NonceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
