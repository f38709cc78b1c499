// src/nonce.rs
// =============================================================================
// Request nonces: short tokens proving a request was prepared for one action.
//
// token = first 10 hex chars of SHA-256("<tick>|<action>|<salt>")
//
// A tick is a 12-hour slot counted from the epoch (rounded up). A token is
// accepted in the tick it was made and in the tick after, so it lives
// between 12 and 24 hours.
// =============================================================================

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::Clock;
use crate::error::{Result, TrackerError};

const TICK_SECS: i64 = 12 * 60 * 60;
const TOKEN_LEN: usize = 10;

pub struct NonceGuard<'a, C: Clock> {
    salt: &'a str,
    clock: &'a C,
}

impl<'a, C: Clock> NonceGuard<'a, C> {
    pub fn new(salt: &'a str, clock: &'a C) -> Self {
        NonceGuard { salt, clock }
    }

    fn tick(&self) -> i64 {
        let secs = self.clock.now().timestamp();
        (secs + TICK_SECS - 1).div_euclid(TICK_SECS)
    }

    fn token(&self, tick: i64, action: &str) -> String {
        let digest = Sha256::digest(format!("{}|{}|{}", tick, action, self.salt).as_bytes());
        let mut token = hex::encode(digest);
        token.truncate(TOKEN_LEN);
        token
    }

    pub fn create(&self, action: &str) -> String {
        self.token(self.tick(), action)
    }

    pub fn is_valid(&self, action: &str, nonce: &str) -> bool {
        if nonce.len() != TOKEN_LEN {
            return false;
        }
        let tick = self.tick();
        [tick, tick - 1].iter().any(|&t| self.token(t, action) == nonce)
    }

    pub fn verify(&self, action: &str, nonce: &str) -> Result<()> {
        if self.is_valid(action, nonce) {
            Ok(())
        } else {
            debug!(action, "rejected nonce");
            Err(TrackerError::InvalidNonce)
        }
    }
}
