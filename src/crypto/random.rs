// Onera CSPRNG wrapper.

use crate::crypto::{CryptoError, CryptoResult};
use rand::rngs::OsRng;
use rand::RngCore;

/// `random(n)` — `n` bytes from the OS CSPRNG. Fails `RngFailure` if the
/// platform's entropy source cannot be read.
pub fn random(length: usize) -> CryptoResult<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::RngFailure(e.to_string()))?;
    Ok(bytes)
}

/// Infallible convenience wrapper for internal callers that already assume
/// a working entropy source (mirrors `random`, panics are never expected in
/// practice since `OsRng` only errors on catastrophic platform failure).
pub fn random_bytes(length: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate random bytes into an existing buffer.
pub fn fill_random(buffer: &mut [u8]) -> CryptoResult<()> {
    OsRng
        .try_fill_bytes(buffer)
        .map_err(|e| CryptoError::RngFailure(e.to_string()))
}

/// Generate random value in range `[0, max)` via rejection sampling (no
/// modulo bias).
pub fn random_range(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let range = u64::MAX - (u64::MAX % max);
    loop {
        let value = OsRng.next_u64();
        if value < range {
            return value % max;
        }
    }
}

/// Secure random number generator wrapper, for callers that need an
/// `RngCore + CryptoRng` (e.g. `x25519_dalek` key generation).
pub struct SecureRng {
    rng: OsRng,
}

impl SecureRng {
    pub fn new() -> Self {
        SecureRng { rng: OsRng }
    }
}

impl Default for SecureRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RngCore for SecureRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

impl rand::CryptoRng for SecureRng {}
