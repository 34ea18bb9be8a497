// Bitwise XOR, used by ShareSplitter to combine/split the master key.

use crate::crypto::{CryptoError, CryptoResult};

/// `xor(a, b)` — bitwise XOR of two equal-length buffers.
pub fn xor(a: &[u8], b: &[u8]) -> CryptoResult<Vec<u8>> {
    if a.len() != b.len() {
        return Err(CryptoError::LengthMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x ^ y).collect())
}

/// In-place variant: `dst ^= src`, both must already be the same length.
pub fn xor_inplace(dst: &mut [u8], src: &[u8]) -> CryptoResult<()> {
    if dst.len() != src.len() {
        return Err(CryptoError::LengthMismatch {
            expected: dst.len(),
            actual: src.len(),
        });
    }
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d ^= s;
    }
    Ok(())
}
