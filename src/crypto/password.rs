// `kdf_password` — memory-hard password KDF (Argon2id), used to derive the
// KEK in the password unlock path.

use crate::crypto::{CryptoError, CryptoResult};
use argon2::{Algorithm, Argon2, Params, Version};

/// Argon2id parameters for a `PasswordEnvelope`. `ops`/`mem` are the
/// on-wire fields of spec.md §3; versioned so a deployment can tune them
/// without breaking older envelopes (`ops`/`mem` travel with the envelope).
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub ops_limit: u32,
    pub mem_limit_kib: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        // OWASP-recommended Argon2id baseline: 3 iterations, 64 MiB.
        Argon2Params {
            ops_limit: 3,
            mem_limit_kib: 64 * 1024,
        }
    }
}

/// `kdf_password(password, salt, ops, mem) -> 32 B`. Fails `KdfFailure` if
/// the requested memory cost cannot be satisfied.
pub fn kdf_password(password: &[u8], salt: &[u8], params: Argon2Params) -> CryptoResult<[u8; 32]> {
    let argon2_params = Params::new(params.mem_limit_kib, params.ops_limit, 1, Some(32))
        .map_err(|e| CryptoError::KdfFailure(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut out = [0u8; 32];
    argon2
        .hash_password_into(password, salt, &mut out)
        .map_err(|e| CryptoError::KdfFailure(e.to_string()))?;
    Ok(out)
}
