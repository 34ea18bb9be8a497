//! 3-of-3 XOR split/reconstruct of the master key (spec §4.3). This is
//! explicitly NOT Shamir secret sharing (Design Notes §9): threshold
//! always equals the share count, 3. Do not generalize to N-of-M.

use crate::crypto::{random, xor};
use crate::error::{CoreError, CoreResult};

const SHARE_LEN: usize = 32;

/// The three shares whose XOR is the master key. `device_share` is stored
/// locally (encrypted), `auth_share` is server-side plaintext, and
/// `recovery_share` is server-side ciphertext sealed under a
/// mnemonic-derived key.
#[derive(Clone)]
pub struct SplitShares {
    pub device_share: [u8; SHARE_LEN],
    pub auth_share: [u8; SHARE_LEN],
    pub recovery_share: [u8; SHARE_LEN],
}

impl std::fmt::Debug for SplitShares {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SplitShares([REDACTED])")
    }
}

/// `split(master) -> (device, auth, recovery)`.
pub fn split(master: &[u8; 32]) -> CoreResult<SplitShares> {
    let device: [u8; SHARE_LEN] = random(SHARE_LEN)?
        .try_into()
        .map_err(|_| CoreError::InvalidKeyLength { expected: SHARE_LEN, actual: 0 })?;
    let auth: [u8; SHARE_LEN] = random(SHARE_LEN)?
        .try_into()
        .map_err(|_| CoreError::InvalidKeyLength { expected: SHARE_LEN, actual: 0 })?;

    let mut recovery = xor::xor(master, &device)?;
    xor::xor_inplace(&mut recovery, &auth)?;
    let recovery: [u8; SHARE_LEN] = recovery
        .try_into()
        .map_err(|_| CoreError::InvalidKeyLength { expected: SHARE_LEN, actual: 0 })?;

    Ok(SplitShares {
        device_share: device,
        auth_share: auth,
        recovery_share: recovery,
    })
}

/// `reconstruct(device, auth, recovery) -> master`. Any share whose length
/// is not 32 bytes is `InvalidKeyLength`; this function only accepts
/// already-fixed-size shares, so the check is enforced by callers that
/// parse untrusted-length input before calling in.
pub fn reconstruct(device: &[u8; 32], auth: &[u8; 32], recovery: &[u8; 32]) -> CoreResult<[u8; 32]> {
    let mut master = xor::xor(device, auth)?;
    xor::xor_inplace(&mut master, recovery)?;
    master
        .try_into()
        .map_err(|_| CoreError::InvalidKeyLength { expected: 32, actual: 0 })
}

/// Validate an untrusted share length before constructing a fixed array.
pub fn validate_share_len(share: &[u8]) -> CoreResult<()> {
    if share.len() != SHARE_LEN {
        return Err(CoreError::InvalidKeyLength {
            expected: SHARE_LEN,
            actual: share.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_reconstruct_roundtrip() {
        let master = [0x77u8; 32];
        let shares = split(&master).unwrap();
        let reconstructed =
            reconstruct(&shares.device_share, &shares.auth_share, &shares.recovery_share).unwrap();
        assert_eq!(reconstructed, master);
    }

    #[test]
    fn test_s1_share_round_trip_scenario() {
        // S1 from spec §8.
        let master = [0x11u8; 32];
        let device = [0x22u8; 32];
        let auth = [0x33u8; 32];
        let recovery = reconstruct(&master, &device, &auth).unwrap(); // master ^ device ^ auth, reused as XOR helper
        assert_eq!(recovery, [0x00u8; 32]);

        let reconstructed = reconstruct(&device, &auth, &recovery).unwrap();
        assert_eq!(reconstructed, [0x11u8; 32]);
    }

    #[test]
    fn test_invalid_share_len_rejected() {
        assert!(validate_share_len(&[0u8; 16]).is_err());
        assert!(validate_share_len(&[0u8; 32]).is_ok());
    }
}
