//! `NoiseNK` (spec §4.10): `Noise_NK_25519_ChaChaPoly_SHA256`, hand-rolled.
//! Grounded on the rejected `snow`-wrapping design in
//! `hxrts-aura/crates/aura-core/src/effects/noise.rs` — we keep that file's
//! initiator/responder split and transport-keys-after-handshake shape, but
//! implement the NK pattern directly over `crypto::x25519` and
//! `crypto::chacha20poly1305_wrapper` instead of depending on `snow`.

use crate::crypto::chacha20poly1305_wrapper as aead;
use crate::crypto::x25519;
use crate::error::{CoreError, CoreResult};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

const PROTOCOL_NAME: &[u8] = b"Noise_NK_25519_ChaChaPoly_SHA256";
const HASH_LEN: usize = 32;

struct SymmetricState {
    h: [u8; HASH_LEN],
    ck: [u8; HASH_LEN],
    k: Option<[u8; 32]>,
    n: u64,
}

impl SymmetricState {
    fn initialize(protocol_name: &[u8]) -> Self {
        let h = if protocol_name.len() <= HASH_LEN {
            let mut buf = [0u8; HASH_LEN];
            buf[..protocol_name.len()].copy_from_slice(protocol_name);
            buf
        } else {
            let mut hasher = Sha256::new();
            hasher.update(protocol_name);
            hasher.finalize().into()
        };
        SymmetricState { h, ck: h, k: None, n: 0 }
    }

    fn mix_hash(&mut self, data: &[u8]) {
        let mut hasher = Sha256::new();
        hasher.update(self.h);
        hasher.update(data);
        self.h = hasher.finalize().into();
    }

    fn mix_key(&mut self, input_key_material: &[u8]) -> CoreResult<()> {
        let output = crate::crypto::hkdf::derive_key_with_salt(&self.ck, &[input_key_material], b"", 64)?;
        self.ck.copy_from_slice(&output[0..32]);
        let mut k = [0u8; 32];
        k.copy_from_slice(&output[32..64]);
        self.k = Some(k);
        self.n = 0;
        Ok(())
    }

    fn encrypt_and_hash(&mut self, plaintext: &[u8]) -> CoreResult<Vec<u8>> {
        let ciphertext = match self.k {
            Some(k) => {
                let nonce = nonce_from_counter(self.n);
                self.n += 1;
                aead::encrypt(&k, &nonce, plaintext, &self.h)?
            }
            None => plaintext.to_vec(),
        };
        self.mix_hash(&ciphertext);
        Ok(ciphertext)
    }

    fn decrypt_and_hash(&mut self, ciphertext: &[u8]) -> CoreResult<Vec<u8>> {
        let plaintext = match self.k {
            Some(k) => {
                let nonce = nonce_from_counter(self.n);
                self.n += 1;
                aead::decrypt(&k, &nonce, ciphertext, &self.h)?
            }
            None => ciphertext.to_vec(),
        };
        self.mix_hash(ciphertext);
        Ok(plaintext)
    }

    fn split(&self) -> CoreResult<([u8; 32], [u8; 32])> {
        let output = crate::crypto::hkdf::derive_key_with_salt(&self.ck, &[&[]], b"", 64)?;
        let mut k1 = [0u8; 32];
        let mut k2 = [0u8; 32];
        k1.copy_from_slice(&output[0..32]);
        k2.copy_from_slice(&output[32..64]);
        Ok((k1, k2))
    }
}

fn nonce_from_counter(n: u64) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[4..12].copy_from_slice(&n.to_le_bytes());
    nonce
}

/// Transport keys established after a completed NK handshake.
pub struct TransportKeys {
    send_key: [u8; 32],
    recv_key: [u8; 32],
    send_n: u64,
    recv_n: u64,
}

impl Drop for TransportKeys {
    fn drop(&mut self) {
        self.send_key.zeroize();
        self.recv_key.zeroize();
    }
}

impl TransportKeys {
    pub fn encrypt(&mut self, plaintext: &[u8]) -> CoreResult<Vec<u8>> {
        let nonce = nonce_from_counter(self.send_n);
        self.send_n += 1;
        aead::encrypt(&self.send_key, &nonce, plaintext, &[])
    }

    pub fn decrypt(&mut self, ciphertext: &[u8]) -> CoreResult<Vec<u8>> {
        let nonce = nonce_from_counter(self.recv_n);
        self.recv_n += 1;
        aead::decrypt(&self.recv_key, &nonce, ciphertext, &[])
    }
}

/// Initiator side of `Noise_NK`: the client, which knows the server's
/// static public key in advance (from `AttestationVerifier`).
pub struct NoiseNkInitiator {
    symmetric: SymmetricState,
    server_static_pub: [u8; 32],
    ephemeral_priv: [u8; 32],
    ephemeral_pub: [u8; 32],
}

impl NoiseNkInitiator {
    pub fn new(server_static_pub: [u8; 32]) -> Self {
        let mut symmetric = SymmetricState::initialize(PROTOCOL_NAME);
        symmetric.mix_hash(&server_static_pub);
        let (ephemeral_pub, ephemeral_priv) = x25519::x25519_keypair();
        Self {
            symmetric,
            server_static_pub,
            ephemeral_priv,
            ephemeral_pub,
        }
    }

    /// Message 1 (-> e, es): send our ephemeral, mix in the DH with the
    /// server's static key, and the (possibly empty) payload.
    pub fn write_message1(&mut self, payload: &[u8]) -> CoreResult<Vec<u8>> {
        self.symmetric.mix_hash(&self.ephemeral_pub);
        let mut es = x25519::x25519_dh(&self.ephemeral_priv, &self.server_static_pub);
        let mix_result = self.symmetric.mix_key(&es);
        es.zeroize();
        mix_result?;
        let ciphertext = self.symmetric.encrypt_and_hash(payload)?;

        let mut message = Vec::with_capacity(32 + ciphertext.len());
        message.extend_from_slice(&self.ephemeral_pub);
        message.extend_from_slice(&ciphertext);
        Ok(message)
    }

    /// Message 2 (<- e, ee): server's ephemeral plus the encrypted payload.
    /// Returns the decrypted payload and the split transport keys.
    pub fn read_message2(mut self, message: &[u8]) -> CoreResult<(Vec<u8>, TransportKeys)> {
        if message.len() < 32 {
            return Err(CoreError::MalformedEnvelope("noise message2 too short".into()));
        }
        let mut server_ephemeral = [0u8; 32];
        server_ephemeral.copy_from_slice(&message[0..32]);
        self.symmetric.mix_hash(&server_ephemeral);

        let mut ee = x25519::x25519_dh(&self.ephemeral_priv, &server_ephemeral);
        let mix_result = self.symmetric.mix_key(&ee);
        ee.zeroize();
        mix_result?;

        let payload = self.symmetric.decrypt_and_hash(&message[32..])?;
        let (k1, k2) = self.symmetric.split()?;
        Ok((
            payload,
            TransportKeys {
                send_key: k1,
                recv_key: k2,
                send_n: 0,
                recv_n: 0,
            },
        ))
    }
}

impl Drop for NoiseNkInitiator {
    fn drop(&mut self) {
        self.ephemeral_priv.zeroize();
    }
}

/// Responder side, for interop tests and any server-emulation fixture.
pub struct NoiseNkResponder {
    symmetric: SymmetricState,
    static_priv: [u8; 32],
    static_pub: [u8; 32],
    ephemeral_priv: [u8; 32],
    ephemeral_pub: [u8; 32],
}

impl NoiseNkResponder {
    pub fn new(static_priv: [u8; 32], static_pub: [u8; 32]) -> Self {
        let mut symmetric = SymmetricState::initialize(PROTOCOL_NAME);
        symmetric.mix_hash(&static_pub);
        let (ephemeral_pub, ephemeral_priv) = x25519::x25519_keypair();
        Self {
            symmetric,
            static_priv,
            static_pub,
            ephemeral_priv,
            ephemeral_pub,
        }
    }

    pub fn read_message1(&mut self, message: &[u8]) -> CoreResult<(Vec<u8>, [u8; 32])> {
        if message.len() < 32 {
            return Err(CoreError::MalformedEnvelope("noise message1 too short".into()));
        }
        let mut client_ephemeral = [0u8; 32];
        client_ephemeral.copy_from_slice(&message[0..32]);
        self.symmetric.mix_hash(&client_ephemeral);

        let mut es = x25519::x25519_dh(&self.static_priv, &client_ephemeral);
        let mix_result = self.symmetric.mix_key(&es);
        es.zeroize();
        mix_result?;
        let payload = self.symmetric.decrypt_and_hash(&message[32..])?;
        Ok((payload, client_ephemeral))
    }

    pub fn write_message2(mut self, client_ephemeral: [u8; 32], payload: &[u8]) -> CoreResult<(Vec<u8>, TransportKeys)> {
        self.symmetric.mix_hash(&self.ephemeral_pub);
        let mut ee = x25519::x25519_dh(&self.ephemeral_priv, &client_ephemeral);
        let mix_result = self.symmetric.mix_key(&ee);
        ee.zeroize();
        mix_result?;
        let ciphertext = self.symmetric.encrypt_and_hash(payload)?;

        let mut message = Vec::with_capacity(32 + ciphertext.len());
        message.extend_from_slice(&self.ephemeral_pub);
        message.extend_from_slice(&ciphertext);

        let (k1, k2) = self.symmetric.split()?;
        // Responder's send/recv keys are swapped relative to the initiator's.
        Ok((
            message,
            TransportKeys {
                send_key: k2,
                recv_key: k1,
                send_n: 0,
                recv_n: 0,
            },
        ))
    }
}

impl Drop for NoiseNkResponder {
    fn drop(&mut self) {
        self.ephemeral_priv.zeroize();
        self.static_priv.zeroize();
    }
}
