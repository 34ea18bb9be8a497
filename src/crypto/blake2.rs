// `kdf_blake2b` — BLAKE2b with a personalization string, used exclusively
// to derive the DeviceShareKey (spec.md §3):
//   BLAKE2b-256(device_id ‖ fingerprint ‖ device_secret, personal="onera.deviceshare.v2")

use crate::crypto::{CryptoError, CryptoResult};
use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;

const PERSONAL_MAX_LEN: usize = 16;

/// `kdf_blake2b(input, personal, len)`. `personal` is truncated/padded to
/// BLAKE2b's 16-byte personalization block, matching the reference
/// behaviour of libsodium's `crypto_generichash_blake2b` personalization.
pub fn kdf_blake2b(input: &[u8], personal: &[u8], len: usize) -> CryptoResult<Vec<u8>> {
    let mut personal_block = [0u8; PERSONAL_MAX_LEN];
    let n = personal.len().min(PERSONAL_MAX_LEN);
    personal_block[..n].copy_from_slice(&personal[..n]);

    let mut hasher = Blake2bVar::new_with_params(&[], &personal_block, 0, len)
        .map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
    hasher.update(input);

    let mut out = vec![0u8; len];
    hasher
        .finalize_variable(&mut out)
        .map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
    Ok(out)
}
