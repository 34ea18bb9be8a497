//! `DeviceIdentity` (spec §4.4): device id, fingerprint, secret retrieval,
//! device-share key derivation. Grounded on the domain-string key
//! derivation idiom of the teacher's `key_hierarchy.rs` and the
//! registration-call shape of `client.rs`.

use crate::crypto::{blake2, secretbox};
use crate::error::{CoreError, CoreResult};
use crate::external::{DeviceRegistration, DeviceRegistry, Token};
use crate::secure_store::{SecureStore, StorePolicy};
use base64::{engine::general_purpose::STANDARD, Engine};
use uuid::Uuid;

const DEVICE_SHARE_PERSONAL: &[u8] = b"onera.deviceshare.v2";
const KEY_DEVICE_ID: &str = "device_id";
const KEY_ENCRYPTED_DEVICE_SHARE: &str = "encrypted_device_share";
const KEY_DEVICE_SHARE_NONCE: &str = "device_share_nonce";

/// Stable platform-reported identity used to build the device fingerprint.
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    pub model: String,
    pub os_version: String,
    pub vendor_id: Option<String>,
}

pub struct DeviceIdentity<'a> {
    store: &'a dyn SecureStore,
    platform: PlatformInfo,
}

impl<'a> DeviceIdentity<'a> {
    pub fn new(store: &'a dyn SecureStore, platform: PlatformInfo) -> Self {
        Self { store, platform }
    }

    /// Returns the persisted device UUID, generating and storing it on
    /// first call.
    pub async fn get_or_create_device_id(&self) -> CoreResult<String> {
        if let Some(existing) = self.store.get(KEY_DEVICE_ID).await? {
            return Ok(String::from_utf8_lossy(&existing).into_owned());
        }
        let id = Uuid::new_v4().to_string();
        self.store
            .put(KEY_DEVICE_ID, id.as_bytes(), StorePolicy::UnlockedThisDeviceOnly)
            .await?;
        Ok(id)
    }

    /// Deterministic across cold starts on the same device/install.
    pub fn fingerprint(&self) -> String {
        let vendor = self.platform.vendor_id.as_deref().unwrap_or("");
        format!("{}|{}|{}", self.platform.model, self.platform.os_version, vendor)
    }

    /// Seals `encrypted_name` under `master_key`, registers with the
    /// server, returns the server-issued `device_secret`.
    pub async fn register(
        &self,
        master_key: &[u8; 32],
        device_name: &str,
        user_agent: &str,
        registry: &dyn DeviceRegistry,
        token: &Token,
    ) -> CoreResult<[u8; 32]> {
        let device_id = self.get_or_create_device_id().await?;
        let (ciphertext, nonce) = secretbox::aead_seal(master_key, device_name.as_bytes())?;

        let secret = registry
            .register(
                token,
                DeviceRegistration {
                    device_id,
                    encrypted_name_b64: STANDARD.encode(ciphertext),
                    name_nonce_b64: STANDARD.encode(nonce),
                    user_agent: user_agent.to_string(),
                },
            )
            .await?;
        Ok(secret)
    }

    /// `BLAKE2b-256(device_id ‖ fingerprint ‖ secret, personal="onera.deviceshare.v2")`.
    pub fn derive_device_share_key(&self, device_id: &str, secret: &[u8; 32]) -> CoreResult<[u8; 32]> {
        let mut input = Vec::with_capacity(device_id.len() + 256 + 32);
        input.extend_from_slice(device_id.as_bytes());
        input.extend_from_slice(self.fingerprint().as_bytes());
        input.extend_from_slice(secret);

        let key = blake2::kdf_blake2b(&input, DEVICE_SHARE_PERSONAL, 32)?;
        key.try_into()
            .map_err(|_| CoreError::InvalidKeyLength { expected: 32, actual: 0 })
    }

    /// Seal and persist the device share under `SecureStore`.
    pub async fn seal_device_share(&self, device_share_key: &[u8; 32], share: &[u8; 32]) -> CoreResult<()> {
        let (ciphertext, nonce) = secretbox::aead_seal(device_share_key, share)?;
        self.store
            .put(KEY_ENCRYPTED_DEVICE_SHARE, &ciphertext, StorePolicy::UnlockedThisDeviceOnly)
            .await?;
        self.store
            .put(KEY_DEVICE_SHARE_NONCE, &nonce, StorePolicy::UnlockedThisDeviceOnly)
            .await?;
        Ok(())
    }

    /// Open the persisted device share. Fails `DeviceNotProvisioned` if no
    /// local device share exists.
    pub async fn open_device_share(&self, device_share_key: &[u8; 32]) -> CoreResult<[u8; 32]> {
        let ciphertext = self
            .store
            .get(KEY_ENCRYPTED_DEVICE_SHARE)
            .await?
            .ok_or(CoreError::DeviceNotProvisioned)?;
        let nonce = self
            .store
            .get(KEY_DEVICE_SHARE_NONCE)
            .await?
            .ok_or(CoreError::DeviceNotProvisioned)?;

        let plaintext = secretbox::aead_open(device_share_key, &ciphertext, &nonce)?;
        plaintext
            .try_into()
            .map_err(|_| CoreError::MalformedEnvelope("device share wrong length".into()))
    }
}
