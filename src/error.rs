// Core error taxonomy (spec §7). Hand-written Display/Error rather than a
// derive, so that `user_message()` stays in lockstep with the exact set of
// stable user-facing strings the spec names.

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CoreError {
    // Input errors
    InvalidKeyLength { expected: usize, actual: usize },
    InvalidMnemonic,
    WrongPassword,
    MalformedEnvelope(String),

    // Crypto failures
    AeadAuthFailure,
    RngFailure(String),
    KdfFailure(String),
    NonceExhausted,

    // Session errors
    SessionLocked,
    DeviceNotProvisioned,
    PasskeyCancelled,
    PasskeyUnavailable,
    BadRecoveryKey,

    // Transport errors
    NetworkError(String),
    Unauthorized,
    RateLimited,
    ServerError(String),

    // Trust errors
    AttestationInvalid { reason: String },

    // Logic errors
    LengthMismatch { expected: usize, actual: usize },
    ChannelClosed,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidKeyLength { expected, actual } => {
                write!(f, "invalid key length: expected {}, got {}", expected, actual)
            }
            CoreError::InvalidMnemonic => write!(f, "invalid recovery phrase"),
            CoreError::WrongPassword => write!(f, "could not decrypt"),
            CoreError::MalformedEnvelope(msg) => write!(f, "malformed envelope: {}", msg),
            CoreError::AeadAuthFailure => write!(f, "could not decrypt"),
            CoreError::RngFailure(msg) => write!(f, "RNG failure: {}", msg),
            CoreError::KdfFailure(msg) => write!(f, "KDF failure: {}", msg),
            CoreError::NonceExhausted => write!(f, "nonce counter exhausted"),
            CoreError::SessionLocked => write!(f, "session expired"),
            CoreError::DeviceNotProvisioned => write!(f, "device not authorised"),
            CoreError::PasskeyCancelled => write!(f, "passkey authentication cancelled"),
            CoreError::PasskeyUnavailable => write!(f, "passkey unavailable"),
            CoreError::BadRecoveryKey => write!(f, "invalid recovery phrase"),
            CoreError::NetworkError(msg) => write!(f, "network error: {}", msg),
            CoreError::Unauthorized => write!(f, "unauthorized"),
            CoreError::RateLimited => write!(f, "rate limited"),
            CoreError::ServerError(msg) => write!(f, "server error: {}", msg),
            CoreError::AttestationInvalid { reason } => write!(f, "attestation invalid: {}", reason),
            CoreError::LengthMismatch { expected, actual } => {
                write!(f, "length mismatch: expected {}, got {}", expected, actual)
            }
            CoreError::ChannelClosed => write!(f, "channel closed"),
        }
    }
}

impl Error for CoreError {}

impl From<crate::crypto::CryptoError> for CoreError {
    fn from(err: crate::crypto::CryptoError) -> Self {
        use crate::crypto::CryptoError as C;
        match err {
            C::RngFailure(msg) => CoreError::RngFailure(msg),
            C::LengthMismatch { expected, actual } => CoreError::LengthMismatch { expected, actual },
            C::AuthFailure => CoreError::AeadAuthFailure,
            C::KdfFailure(msg) => CoreError::KdfFailure(msg),
            C::InvalidInput(msg) => CoreError::MalformedEnvelope(msg),
            C::NonceExhausted => CoreError::NonceExhausted,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Maps any error kind to one of the small set of stable, user-facing
    /// strings named in spec §7's last paragraph. Never leaks which of key,
    /// nonce, or ciphertext was at fault for a decryption failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            CoreError::WrongPassword | CoreError::AeadAuthFailure => "wrong password",
            CoreError::InvalidMnemonic | CoreError::BadRecoveryKey => "invalid recovery phrase",
            CoreError::SessionLocked => "session expired",
            CoreError::NetworkError(_) | CoreError::ServerError(_) | CoreError::RateLimited => {
                "network error"
            }
            CoreError::DeviceNotProvisioned | CoreError::Unauthorized => "device not authorised",
            _ => "something went wrong",
        }
    }
}
