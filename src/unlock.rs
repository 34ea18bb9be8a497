//! `UnlockPaths` (spec §4.5): orchestrates master-key reconstruction across
//! the five sub-flows. Grounded on the teacher's `client.rs` top-level
//! orchestration methods — each sub-flow here plays the role one of those
//! methods played, composing the lower-level primitives instead of owning
//! crypto directly.
//!
//! The server holds `auth_share` and `recovery_share` in plaintext (either
//! lets the device-share flow reconstruct `master = device ⊕ auth ⊕
//! recovery` without the mnemonic); `enc_recovery_share` and
//! `master_key_recovery` are mnemonic-sealed, redundant copies for the
//! no-device recovery flow.

use crate::crypto::{hkdf, mnemonic, password, secretbox, x25519};
use crate::device_identity::DeviceIdentity;
use crate::error::{CoreError, CoreResult};
use crate::external::{Clock, DeviceRegistry, KeyShareStore, KeySharesRecord, PasskeyAuthOptions, PasskeyProvider, Token};
use crate::session::SecureSession;
use crate::share_splitter;
use base64::{engine::general_purpose::STANDARD, Engine};
use zeroize::Zeroize;

fn decode_b64(s: &str) -> CoreResult<Vec<u8>> {
    STANDARD.decode(s).map_err(|e| CoreError::MalformedEnvelope(e.to_string()))
}

fn fixed32(bytes: Vec<u8>) -> CoreResult<[u8; 32]> {
    let len = bytes.len();
    bytes.try_into().map_err(|_| CoreError::InvalidKeyLength { expected: 32, actual: len })
}

/// Output of a successful setup: the caller MUST display `mnemonic` exactly
/// once and then discard it.
pub struct SetupResult {
    pub mnemonic: String,
    pub public_key: [u8; 32],
}

/// Server-supplied envelope for the password unlock path.
pub struct PasswordEnvelope {
    pub salt: Vec<u8>,
    pub ops_limit: u32,
    pub mem_limit_kib: u32,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
}

pub struct UnlockPaths<'a> {
    pub session: &'a SecureSession,
    pub key_shares: &'a dyn KeyShareStore,
    pub devices: &'a dyn DeviceRegistry,
    pub passkeys: &'a dyn PasskeyProvider,
    pub clock: &'a dyn Clock,
}

impl<'a> UnlockPaths<'a> {
    /// §4.5.1: brand-new user. Splits a fresh master key, registers this
    /// device, and transmits the server-side shares. Returns the mnemonic
    /// exactly once.
    pub async fn setup(
        &self,
        token: &Token,
        device_identity: &DeviceIdentity<'_>,
        device_name: &str,
        user_agent: &str,
    ) -> CoreResult<SetupResult> {
        let master: [u8; 32] = crate::crypto::random::random(32)?
            .try_into()
            .map_err(|_| CoreError::InvalidKeyLength { expected: 32, actual: 0 })?;
        let (public_key, mut secret_key) = x25519::x25519_keypair();

        let shares = share_splitter::split(&master)?;
        let mnemonic_phrase = mnemonic::mnemonic_generate()?;
        let mut recovery_key = mnemonic::kdf_from_mnemonic(&mnemonic_phrase)?;

        let (enc_recovery_share, recovery_share_nonce) = secretbox::aead_seal(&recovery_key, &shares.recovery_share)?;
        let (enc_private_key, private_key_nonce) = secretbox::aead_seal(&master, &secret_key)?;
        let (enc_recovery_key, recovery_key_nonce) = secretbox::aead_seal(&master, &recovery_key)?;
        let (master_key_recovery, master_key_recovery_nonce) = secretbox::aead_seal(&recovery_key, &master)?;

        let record = KeySharesRecord {
            auth_share_b64: STANDARD.encode(shares.auth_share),
            recovery_share_b64: STANDARD.encode(shares.recovery_share),
            enc_recovery_share_b64: STANDARD.encode(enc_recovery_share),
            recovery_share_nonce_b64: STANDARD.encode(recovery_share_nonce),
            public_key_b64: STANDARD.encode(public_key),
            enc_private_key_b64: STANDARD.encode(enc_private_key),
            private_key_nonce_b64: STANDARD.encode(private_key_nonce),
            enc_recovery_key_b64: STANDARD.encode(enc_recovery_key),
            recovery_key_nonce_b64: STANDARD.encode(recovery_key_nonce),
            master_key_recovery_b64: STANDARD.encode(master_key_recovery),
            master_key_recovery_nonce_b64: STANDARD.encode(master_key_recovery_nonce),
        };
        self.key_shares.create(token, record).await?;

        let device_secret = device_identity.register(&master, device_name, user_agent, self.devices, token).await?;
        let device_id = device_identity.get_or_create_device_id().await?;
        let device_share_key = device_identity.derive_device_share_key(&device_id, &device_secret)?;
        device_identity.seal_device_share(&device_share_key, &shares.device_share).await?;

        self.session.unlock(master, secret_key, public_key, Some(recovery_key), self.clock);

        secret_key.zeroize();
        recovery_key.zeroize();
        Ok(SetupResult {
            mnemonic: mnemonic_phrase,
            public_key,
        })
    }

    /// §4.5.2: silent unlock from the locally persisted device share.
    /// Fails `DeviceNotProvisioned` if no local device share exists.
    pub async fn unlock_with_device_share(&self, token: &Token, device_identity: &DeviceIdentity<'_>) -> CoreResult<()> {
        let record = self.key_shares.get(token).await?;
        let auth_share = fixed32(decode_b64(&record.auth_share_b64)?)?;
        let recovery_share = fixed32(decode_b64(&record.recovery_share_b64)?)?;

        let device_id = device_identity.get_or_create_device_id().await?;
        let device_secret = self.devices.get_secret(token, &device_id).await?;
        let device_share_key = device_identity.derive_device_share_key(&device_id, &device_secret)?;
        let device_share = device_identity.open_device_share(&device_share_key).await?;

        let master = share_splitter::reconstruct(&device_share, &auth_share, &recovery_share)?;
        let public_key = fixed32(decode_b64(&record.public_key_b64)?)?;
        let enc_private_key = decode_b64(&record.enc_private_key_b64)?;
        let private_key_nonce = decode_b64(&record.private_key_nonce_b64)?;
        let secret_key = fixed32(secretbox::aead_open(&master, &enc_private_key, &private_key_nonce)?)?;

        self.session.unlock(master, secret_key, public_key, None, self.clock);
        self.devices.update_last_seen(token, &device_id).await?;
        Ok(())
    }

    /// §4.5.3: password unlock.
    pub async fn unlock_with_password(
        &self,
        token: &Token,
        password_bytes: &[u8],
        envelope: &PasswordEnvelope,
    ) -> CoreResult<()> {
        let mut kek = password::kdf_password(
            password_bytes,
            &envelope.salt,
            password::Argon2Params {
                ops_limit: envelope.ops_limit,
                mem_limit_kib: envelope.mem_limit_kib,
            },
        )
        .map_err(CoreError::from)?;

        let master_result = secretbox::aead_open(&kek, &envelope.ciphertext, &envelope.nonce).map_err(|e| {
            if matches!(e, CoreError::AeadAuthFailure) {
                CoreError::WrongPassword
            } else {
                e
            }
        });
        kek.zeroize();
        let master = fixed32(master_result?)?;

        let (public_key, secret_key) = self.recover_identity_keypair(token, &master).await?;
        self.session.unlock(master, secret_key, public_key, None, self.clock);
        Ok(())
    }

    /// §4.5.4: passkey (WebAuthn PRF) unlock, with the device-bound KEK
    /// fallback when the authenticator lacks PRF support.
    pub async fn unlock_with_passkey(
        &self,
        token: &Token,
        options: &PasskeyAuthOptions,
        enc_master: &[u8],
        nonce: &[u8],
        fallback_device_kek: Option<&[u8; 32]>,
    ) -> CoreResult<()> {
        let assertion = self.passkeys.authenticate(options).await?;

        let mut kek = match assertion.prf_output {
            Some(prf_output) => {
                let prf_salt = options
                    .prf_salts
                    .iter()
                    .find(|(cred_id, _)| cred_id == &assertion.credential_id)
                    .map(|(_, salt)| *salt)
                    .ok_or_else(|| CoreError::MalformedEnvelope("no prf_salt for credential".into()))?;
                let derived = hkdf::derive_key_with_salt(&prf_salt, &[&prf_output], b"onera-webauthn-prf-kek-v1", 32)
                    .map_err(CoreError::from)?;
                fixed32(derived)?
            }
            None => *fallback_device_kek.ok_or(CoreError::PasskeyUnavailable)?,
        };

        let master_bytes = secretbox::aead_open(&kek, enc_master, nonce);
        kek.zeroize();
        let master = fixed32(master_bytes?)?;

        let (public_key, secret_key) = self.recover_identity_keypair(token, &master).await?;
        self.session.unlock(master, secret_key, public_key, None, self.clock);
        Ok(())
    }

    /// §4.5.5: recovery-mnemonic unlock, re-provisioning the device share.
    /// Atomic: on device re-registration failure the session is left
    /// locked. Fails `InvalidMnemonic` on checksum error, `BadRecoveryKey`
    /// on AEAD failure.
    pub async fn unlock_with_recovery_mnemonic(
        &self,
        token: &Token,
        phrase: &str,
        device_identity: &DeviceIdentity<'_>,
        device_name: &str,
        user_agent: &str,
    ) -> CoreResult<()> {
        if !mnemonic::mnemonic_validate(phrase) {
            return Err(CoreError::InvalidMnemonic);
        }
        let mut recovery_key = mnemonic::kdf_from_mnemonic(phrase).map_err(CoreError::from)?;

        let record = self.key_shares.get(token).await?;
        let master_key_recovery = decode_b64(&record.master_key_recovery_b64)?;
        let master_key_recovery_nonce = decode_b64(&record.master_key_recovery_nonce_b64)?;
        let master_bytes = secretbox::aead_open(&recovery_key, &master_key_recovery, &master_key_recovery_nonce)
            .map_err(|e| if matches!(e, CoreError::AeadAuthFailure) { CoreError::BadRecoveryKey } else { e });
        recovery_key.zeroize();
        let master = fixed32(master_bytes?)?;

        // Re-provision this device's share before declaring the session
        // unlocked: if registration fails, the session stays locked.
        let new_shares = share_splitter::split(&master)?;
        let device_secret = device_identity.register(&master, device_name, user_agent, self.devices, token).await?;
        let device_id = device_identity.get_or_create_device_id().await?;
        let device_share_key = device_identity.derive_device_share_key(&device_id, &device_secret)?;
        device_identity.seal_device_share(&device_share_key, &new_shares.device_share).await?;

        let public_key = fixed32(decode_b64(&record.public_key_b64)?)?;
        let enc_private_key = decode_b64(&record.enc_private_key_b64)?;
        let private_key_nonce = decode_b64(&record.private_key_nonce_b64)?;
        let secret_key = fixed32(secretbox::aead_open(&master, &enc_private_key, &private_key_nonce)?)?;

        self.session.unlock(master, secret_key, public_key, None, self.clock);
        Ok(())
    }

    /// Recovers the X25519 identity keypair generated once at setup
    /// (§4.5.1) and persisted encrypted under the master key, rather than
    /// minting a fresh one on every unlock.
    async fn recover_identity_keypair(&self, token: &Token, master: &[u8; 32]) -> CoreResult<([u8; 32], [u8; 32])> {
        let record = self.key_shares.get(token).await?;
        let public_key = fixed32(decode_b64(&record.public_key_b64)?)?;
        let enc_private_key = decode_b64(&record.enc_private_key_b64)?;
        let private_key_nonce = decode_b64(&record.private_key_nonce_b64)?;
        let secret_key = fixed32(secretbox::aead_open(master, &enc_private_key, &private_key_nonce)?)?;
        Ok((public_key, secret_key))
    }
}
