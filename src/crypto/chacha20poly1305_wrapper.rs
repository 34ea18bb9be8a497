//! ChaCha20-Poly1305 wrapper used by `NoiseNK` for `EncryptAndHash` and
//! transport-frame encryption. Unlike the wire envelope AEAD
//! (`crypto::secretbox`, XSalsa20-Poly1305/24-byte nonce), Noise mandates an
//! explicit 12-byte nonce the caller constructs from its own counter — this
//! wrapper never derives nonces itself, it only enforces the length and the
//! tag layout.

use crate::crypto::{CryptoError, CryptoResult};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};

/// Encrypt `plaintext` under `key` with the caller-supplied 12-byte `nonce`.
/// Returns ciphertext with the Poly1305 tag appended.
pub fn encrypt(key: &[u8; 32], nonce: &[u8; 12], plaintext: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = Nonce::from_slice(nonce);
    cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::AuthFailure)
}

/// Decrypt `ciphertext` (with trailing tag) under `key`/`nonce`.
pub fn decrypt(key: &[u8; 32], nonce: &[u8; 12], ciphertext: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = Nonce::from_slice(nonce);
    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::AuthFailure)
}
