// HKDF-SHA-256 (`kdf_hkdf`). Used for the passkey-PRF KEK, for NoiseNK's
// MixKey/Split, and anywhere else the design calls for a generic
// extract-and-expand derivation.

use crate::crypto::{CryptoError, CryptoResult};
use hkdf::Hkdf;
use sha2::Sha256;

/// Derive a key from one or more input-key-material slices, with no salt
/// (acceptable per RFC 5869 when the caller has no salt to provide).
pub fn derive_key(input_key_material: &[&[u8]], info: &[u8], output_length: usize) -> CryptoResult<Vec<u8>> {
    derive_key_with_salt(&[], input_key_material, info, output_length)
}

/// Derive a key with an explicit salt. `kdf_hkdf(ikm, salt, info, len)`.
pub fn derive_key_with_salt(
    salt: &[u8],
    input_key_material: &[&[u8]],
    info: &[u8],
    output_length: usize,
) -> CryptoResult<Vec<u8>> {
    let mut ikm = Vec::new();
    for material in input_key_material {
        ikm.extend_from_slice(material);
    }

    let hkdf = Hkdf::<Sha256>::new(if salt.is_empty() { None } else { Some(salt) }, &ikm);

    let mut output = vec![0u8; output_length];
    hkdf.expand(info, &mut output)
        .map_err(|e| CryptoError::KdfFailure(format!("HKDF expand failed: {}", e)))?;

    Ok(output)
}
