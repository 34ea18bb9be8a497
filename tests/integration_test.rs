//! End-to-end flows through `CoreContext`: setup, device-share unlock,
//! chat sealing, and credential storage, wired together the way a host
//! application would use them.

use async_trait::async_trait;
use onera_core::credential_vault::CredentialVault;
use onera_core::device_identity::{DeviceIdentity, PlatformInfo};
use onera_core::external::{Device, DeviceRegistration, KeySharesRecord, PasskeyAssertion, PasskeyAuthOptions};
use onera_core::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeKeyShareStore {
    record: Mutex<Option<KeySharesRecord>>,
}

#[async_trait]
impl KeyShareStore for FakeKeyShareStore {
    async fn check(&self, _token: &Token) -> CoreResult<bool> {
        Ok(self.record.lock().unwrap().is_some())
    }
    async fn get(&self, _token: &Token) -> CoreResult<KeySharesRecord> {
        self.record.lock().unwrap().clone().ok_or(CoreError::Unauthorized)
    }
    async fn create(&self, _token: &Token, record: KeySharesRecord) -> CoreResult<()> {
        *self.record.lock().unwrap() = Some(record);
        Ok(())
    }
}

#[derive(Default)]
struct FakeDeviceRegistry {
    secrets: Mutex<HashMap<String, [u8; 32]>>,
}

#[async_trait]
impl DeviceRegistry for FakeDeviceRegistry {
    async fn register(&self, _token: &Token, registration: DeviceRegistration) -> CoreResult<[u8; 32]> {
        let secret = [0x7Au8; 32];
        self.secrets.lock().unwrap().insert(registration.device_id, secret);
        Ok(secret)
    }
    async fn get_secret(&self, _token: &Token, device_id: &str) -> CoreResult<[u8; 32]> {
        self.secrets
            .lock()
            .unwrap()
            .get(device_id)
            .copied()
            .ok_or(CoreError::DeviceNotProvisioned)
    }
    async fn update_last_seen(&self, _token: &Token, _device_id: &str) -> CoreResult<()> {
        Ok(())
    }
    async fn list(&self, _token: &Token) -> CoreResult<Vec<Device>> {
        Ok(vec![])
    }
    async fn revoke(&self, _token: &Token, _device_id: &str) -> CoreResult<()> {
        Ok(())
    }
}

struct NoPasskeys;
#[async_trait]
impl PasskeyProvider for NoPasskeys {
    async fn create_credential(&self, _options: &PasskeyAuthOptions) -> CoreResult<PasskeyAssertion> {
        Err(CoreError::PasskeyUnavailable)
    }
    async fn authenticate(&self, _options: &PasskeyAuthOptions) -> CoreResult<PasskeyAssertion> {
        Err(CoreError::PasskeyUnavailable)
    }
}

struct VirtualClock(std::sync::atomic::AtomicU64);
impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}
impl VirtualClock {
    fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, std::sync::atomic::Ordering::SeqCst);
    }
}

fn platform() -> PlatformInfo {
    PlatformInfo {
        model: "Integration Test Device".to_string(),
        os_version: "1.0".to_string(),
        vendor_id: Some("it-vendor".to_string()),
    }
}

fn context_with_clock(clock: Arc<VirtualClock>) -> CoreContext {
    CoreContext::new(CoreContextConfig {
        session: SessionConfig::default(),
        secure_store: Arc::new(onera_core::secure_store::MemorySecureStore::new()),
        key_shares: Arc::new(FakeKeyShareStore::default()),
        devices: Arc::new(FakeDeviceRegistry::default()),
        passkeys: Arc::new(NoPasskeys),
    })
    .with_clock(clock)
}

fn context() -> CoreContext {
    context_with_clock(Arc::new(VirtualClock(std::sync::atomic::AtomicU64::new(0))))
}

/// Setup a brand-new user, seal a chat and a provider credential under the
/// resulting master key, then confirm both open back correctly — the
/// ordinary "new account" path a host application drives end to end.
#[tokio::test]
async fn setup_then_seal_chat_and_credential() {
    let ctx = context();
    let device_identity = DeviceIdentity::new(ctx.secure_store.as_ref(), platform());
    let paths = UnlockPaths {
        session: &ctx.session,
        key_shares: ctx.key_shares.as_ref(),
        devices: ctx.devices.as_ref(),
        passkeys: ctx.passkeys.as_ref(),
        clock: ctx.clock.as_ref(),
    };

    let token = "session-token".to_string();
    let setup = paths.setup(&token, &device_identity, "Integration Phone", "it-agent/1.0").await.unwrap();
    assert!(ctx.session.is_unlocked());
    assert_eq!(setup.mnemonic.split_whitespace().count(), 24);

    let master_key = ctx.session.with_master_key(|k| *k).unwrap();

    let (envelope, chat_key) = onera_core::chat_envelope::seal_chat(
        &master_key,
        None,
        "My first chat",
        vec![onera_core::chat_envelope::ChatMessage {
            role: "user".to_string(),
            content: "hello onera".to_string(),
            created_at: 0,
        }],
        0,
    )
    .unwrap();
    ctx.chat_key_cache.lock().unwrap().put("chat-1".to_string(), chat_key, 0);

    let (opened_key, title, body) = onera_core::chat_envelope::open_chat(&master_key, &envelope).unwrap();
    assert_eq!(opened_key, chat_key);
    assert_eq!(title, "My first chat");
    assert_eq!(body.messages[0].content, "hello onera");
    assert_eq!(ctx.chat_key_cache.lock().unwrap().get("chat-1", 0), Some(chat_key));

    let row = CredentialVault::store(&master_key, "openai", b"sk-integration-test").unwrap();
    let decrypted = CredentialVault::fetch(&master_key, &row).unwrap();
    assert_eq!(decrypted.as_bytes(), b"sk-integration-test");
}

/// Property 5: every unlock path that can reach a given master key
/// produces identical bytes. Set up once, lock, then unlock via the
/// device share and separately via the recovery mnemonic — both must
/// reconstruct the same master.
#[tokio::test]
async fn property5_device_share_and_mnemonic_unlock_agree_on_master() {
    let ctx = context();
    let device_identity = DeviceIdentity::new(ctx.secure_store.as_ref(), platform());
    let paths = UnlockPaths {
        session: &ctx.session,
        key_shares: ctx.key_shares.as_ref(),
        devices: ctx.devices.as_ref(),
        passkeys: ctx.passkeys.as_ref(),
        clock: ctx.clock.as_ref(),
    };

    let token = "session-token".to_string();
    let setup = paths.setup(&token, &device_identity, "Device A", "it-agent/1.0").await.unwrap();
    let original_master = ctx.session.with_master_key(|k| *k).unwrap();
    ctx.lock();
    assert!(!ctx.session.is_unlocked());

    paths.unlock_with_device_share(&token, &device_identity).await.unwrap();
    let via_device_share = ctx.session.with_master_key(|k| *k).unwrap();
    assert_eq!(via_device_share, original_master);
    ctx.lock();

    paths
        .unlock_with_recovery_mnemonic(&token, &setup.mnemonic, &device_identity, "Device A", "it-agent/1.0")
        .await
        .unwrap();
    let via_mnemonic = ctx.session.with_master_key(|k| *k).unwrap();
    assert_eq!(via_mnemonic, original_master);
}

/// Explicit `lock()` clears the chat-key cache alongside the session, so a
/// re-unlock starts from an empty cache.
#[tokio::test]
async fn ctx_lock_clears_chat_key_cache() {
    let ctx = context();
    let device_identity = DeviceIdentity::new(ctx.secure_store.as_ref(), platform());
    let paths = UnlockPaths {
        session: &ctx.session,
        key_shares: ctx.key_shares.as_ref(),
        devices: ctx.devices.as_ref(),
        passkeys: ctx.passkeys.as_ref(),
        clock: ctx.clock.as_ref(),
    };
    paths.setup(&"t".to_string(), &device_identity, "D", "a").await.unwrap();

    ctx.chat_key_cache.lock().unwrap().put("c".to_string(), [0x09; 32], 0);
    ctx.lock();
    assert!(!ctx.session.is_unlocked());
    assert_eq!(ctx.chat_key_cache.lock().unwrap().get("c", 0), None);
}

/// `CoreContext::check_idle_timeout` locking the session (via the virtual
/// clock) also clears the chat-key cache, matching the explicit-lock path.
#[tokio::test]
async fn ctx_idle_timeout_locks_and_clears_cache() {
    let clock = Arc::new(VirtualClock(std::sync::atomic::AtomicU64::new(0)));
    let ctx = context_with_clock(clock.clone());
    let device_identity = DeviceIdentity::new(ctx.secure_store.as_ref(), platform());
    let paths = UnlockPaths {
        session: &ctx.session,
        key_shares: ctx.key_shares.as_ref(),
        devices: ctx.devices.as_ref(),
        passkeys: ctx.passkeys.as_ref(),
        clock: ctx.clock.as_ref(),
    };
    paths.setup(&"t".to_string(), &device_identity, "D", "a").await.unwrap();
    ctx.chat_key_cache.lock().unwrap().put("c".to_string(), [0x09; 32], clock.now_ms());

    clock.advance(30 * 60 * 1000 + 1);
    ctx.check_idle_timeout();

    assert!(!ctx.session.is_unlocked());
    assert_eq!(ctx.chat_key_cache.lock().unwrap().get("c", clock.now_ms()), None);
}
