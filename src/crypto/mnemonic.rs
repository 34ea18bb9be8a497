// BIP-39 mnemonic generation/validation, and the fixed recovery-key
// derivation the spec mandates (resolves the Open Question in spec.md §9:
// PBKDF2-HMAC-SHA-256, salt="mnemonic", 2048 iterations, 32 bytes — not
// SHA-256-of-the-phrase, not a raw BIP-39 seed truncation).

use crate::crypto::{random, CryptoError, CryptoResult};
use bip39::Mnemonic;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

const PBKDF2_ITERATIONS: u32 = 2048;
const PBKDF2_SALT: &[u8] = b"mnemonic";

/// `mnemonic_generate() -> Phrase`. 256 bits of entropy, 24 words,
/// checksum appended per BIP-39.
pub fn mnemonic_generate() -> CryptoResult<String> {
    let entropy = random(32)?;
    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// `mnemonic_validate(phrase) -> bool`, checksum-verified.
pub fn mnemonic_validate(phrase: &str) -> bool {
    Mnemonic::parse_normalized(phrase).is_ok()
}

/// Derive the 32-byte recovery key from a 24-word phrase. Fails
/// `InvalidInput` if the phrase's checksum doesn't validate.
pub fn kdf_from_mnemonic(phrase: &str) -> CryptoResult<[u8; 32]> {
    let mnemonic = Mnemonic::parse_normalized(phrase)
        .map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
    let normalized = mnemonic.to_string();

    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha256>(normalized.as_bytes(), PBKDF2_SALT, PBKDF2_ITERATIONS, &mut out);
    Ok(out)
}
