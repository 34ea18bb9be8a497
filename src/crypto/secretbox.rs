//! The wire AEAD: XSalsa20-Poly1305, 24-byte nonce, tag appended to
//! ciphertext. This is the one envelope cipher every persisted secret in
//! the core is sealed under — chat keys, chat bodies, credentials, device
//! shares, recovery envelopes. Do not reach for `chacha20poly1305_wrapper`
//! for any of these; that module is reserved for the Noise transport.

use crate::crypto::{random, CryptoError, CryptoResult};
use xsalsa20poly1305::{
    aead::{Aead, KeyInit},
    Key, XSalsa20Poly1305, NONCE_SIZE,
};

/// `aead_seal(key, plaintext) -> (ciphertext, nonce)`. `key` must be 32
/// bytes. The nonce is freshly drawn from the CSPRNG.
pub fn aead_seal(key: &[u8], plaintext: &[u8]) -> CryptoResult<(Vec<u8>, [u8; NONCE_SIZE])> {
    if key.len() != 32 {
        return Err(CryptoError::LengthMismatch {
            expected: 32,
            actual: key.len(),
        });
    }
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(&random(NONCE_SIZE)?);

    let cipher = XSalsa20Poly1305::new(Key::from_slice(key));
    let ciphertext = cipher
        .encrypt(xsalsa20poly1305::Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CryptoError::AuthFailure)?;

    Ok((ciphertext, nonce_bytes))
}

/// `aead_open(key, ciphertext, nonce) -> plaintext`. Fails `AuthFailure` on
/// tag mismatch or tampering — callers MUST NOT distinguish this from a
/// wrong key or a wrong nonce in any user-visible message.
pub fn aead_open(key: &[u8], ciphertext: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
    if key.len() != 32 {
        return Err(CryptoError::LengthMismatch {
            expected: 32,
            actual: key.len(),
        });
    }
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::LengthMismatch {
            expected: NONCE_SIZE,
            actual: nonce.len(),
        });
    }
    let cipher = XSalsa20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(xsalsa20poly1305::Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = [0xAAu8; 32];
        let (ct, nonce) = aead_seal(&key, b"hello").unwrap();
        let pt = aead_open(&key, &ct, &nonce).unwrap();
        assert_eq!(pt, b"hello");
    }

    #[test]
    fn test_bit_flip_ciphertext_fails() {
        let key = [0xAAu8; 32];
        let (mut ct, nonce) = aead_seal(&key, b"hello").unwrap();
        ct[0] ^= 0x01;
        assert!(matches!(aead_open(&key, &ct, &nonce), Err(CryptoError::AuthFailure)));
    }

    #[test]
    fn test_bit_flip_nonce_fails() {
        let key = [0xAAu8; 32];
        let (ct, mut nonce) = aead_seal(&key, b"hello").unwrap();
        nonce[0] ^= 0x01;
        assert!(matches!(aead_open(&key, &ct, &nonce), Err(CryptoError::AuthFailure)));
    }

    #[test]
    fn test_wrong_key_length() {
        let key = [0xAAu8; 16];
        assert!(matches!(
            aead_seal(&key, b"x"),
            Err(CryptoError::LengthMismatch { .. })
        ));
    }
}
