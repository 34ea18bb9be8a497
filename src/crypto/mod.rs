// Onera cryptographic core.
//
// Deliberately narrow surface: the rest of the crate never reaches past
// these modules for raw primitives.

pub mod blake2;
pub mod chacha20poly1305_wrapper;
pub mod constant_time;
pub mod hkdf;
pub mod mnemonic;
pub mod password;
pub mod random;
pub mod secretbox;
pub mod x25519;
pub mod xor;

use std::error::Error;
use std::fmt;

/// Cryptographic failure taxonomy. Always fatal to the calling operation;
/// no layer retries after one of these.
#[derive(Debug, Clone)]
pub enum CryptoError {
    RngFailure(String),
    LengthMismatch { expected: usize, actual: usize },
    AuthFailure,
    KdfFailure(String),
    InvalidInput(String),
    NonceExhausted,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::RngFailure(msg) => write!(f, "RNG failure: {}", msg),
            CryptoError::LengthMismatch { expected, actual } => {
                write!(f, "length mismatch: expected {}, got {}", expected, actual)
            }
            CryptoError::AuthFailure => write!(f, "could not decrypt"),
            CryptoError::KdfFailure(msg) => write!(f, "KDF failure: {}", msg),
            CryptoError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            CryptoError::NonceExhausted => write!(f, "nonce counter exhausted"),
        }
    }
}

impl Error for CryptoError {}

pub type CryptoResult<T> = Result<T, CryptoError>;
