//! External collaborator traits (spec §6). The core consumes these; it
//! never implements or owns the networking/platform code behind them.
//! Grounded on the teacher's `StorageBackend`/`AuditSink` trait-object
//! pattern — dynamic dispatch lives only at this `CoreContext` boundary
//! (Design Notes §9).

use crate::error::CoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A bearer token for server RPCs. Opaque to the core.
pub type Token = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySharesRecord {
    pub auth_share_b64: String,
    pub recovery_share_b64: String,
    pub enc_recovery_share_b64: String,
    pub recovery_share_nonce_b64: String,
    pub public_key_b64: String,
    pub enc_private_key_b64: String,
    pub private_key_nonce_b64: String,
    pub enc_recovery_key_b64: String,
    pub recovery_key_nonce_b64: String,
    pub master_key_recovery_b64: String,
    pub master_key_recovery_nonce_b64: String,
}

#[async_trait]
pub trait KeyShareStore: Send + Sync {
    async fn check(&self, token: &Token) -> CoreResult<bool>;
    async fn get(&self, token: &Token) -> CoreResult<KeySharesRecord>;
    async fn create(&self, token: &Token, record: KeySharesRecord) -> CoreResult<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub device_id: String,
    pub encrypted_name_b64: String,
    pub name_nonce_b64: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub user_agent: String,
    pub last_seen_ms: u64,
}

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn register(&self, token: &Token, registration: DeviceRegistration) -> CoreResult<[u8; 32]>;
    async fn get_secret(&self, token: &Token, device_id: &str) -> CoreResult<[u8; 32]>;
    async fn update_last_seen(&self, token: &Token, device_id: &str) -> CoreResult<()>;
    async fn list(&self, token: &Token) -> CoreResult<Vec<Device>>;
    async fn revoke(&self, token: &Token, device_id: &str) -> CoreResult<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedSummary {
    pub id: String,
    pub updated_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedRecord {
    pub id: String,
    pub fields: std::collections::HashMap<String, String>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn list(&self, token: &Token) -> CoreResult<Vec<EncryptedSummary>>;
    async fn get(&self, token: &Token, id: &str) -> CoreResult<EncryptedRecord>;
    async fn create(&self, token: &Token, record: EncryptedRecord) -> CoreResult<String>;
    async fn update(&self, token: &Token, record: EncryptedRecord) -> CoreResult<()>;
    async fn delete(&self, token: &Token, id: &str) -> CoreResult<()>;
}

#[derive(Debug, Clone)]
pub struct PasskeyAssertion {
    pub credential_id: Vec<u8>,
    pub assertion: Vec<u8>,
    pub prf_output: Option<[u8; 32]>,
}

#[derive(Debug, Clone)]
pub struct PasskeyAuthOptions {
    pub prf_salts: Vec<(Vec<u8>, [u8; 32])>, // (credential_id, prf_salt)
}

#[async_trait]
pub trait PasskeyProvider: Send + Sync {
    async fn create_credential(&self, options: &PasskeyAuthOptions) -> CoreResult<PasskeyAssertion>;
    async fn authenticate(&self, options: &PasskeyAuthOptions) -> CoreResult<PasskeyAssertion>;
}

/// Injectable clock, so idle/background-lock tests (S4, S5) can advance
/// virtual time instead of sleeping in real time.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        crate::time::current_time_millis()
    }
}
