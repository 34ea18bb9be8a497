// `x25519_keypair`/`x25519_dh`. Thin wrapper over `x25519_dalek`; factored
// out of the handshake code since both `UnlockPaths` (setup keypair) and
// `NoiseNK` (per-message ephemerals) need it.

use crate::crypto::random::SecureRng;
use x25519_dalek::{PublicKey, StaticSecret};

/// `x25519_keypair() -> (pk, sk)`, both 32 bytes.
pub fn x25519_keypair() -> ([u8; 32], [u8; 32]) {
    let secret = StaticSecret::random_from_rng(SecureRng::new());
    let public = PublicKey::from(&secret);
    (public.to_bytes(), secret.to_bytes())
}

/// `x25519_dh(sk, pk) -> 32 B` shared secret.
pub fn x25519_dh(sk: &[u8; 32], pk: &[u8; 32]) -> [u8; 32] {
    let secret = StaticSecret::from(*sk);
    let public = PublicKey::from(*pk);
    secret.diffie_hellman(&public).to_bytes()
}
