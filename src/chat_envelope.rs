//! `ChatEnvelope` + `ChatKeyCache` (spec §4.7). Sealing/opening grounded on
//! the teacher's send/receive framing shape (`protocol/session.rs`);
//! `ChatKeyCache` hand-rolled as a `HashMap` evicting expired-then-oldest,
//! matching the teacher's own `SessionManager::cleanup_inactive` (`retain`)
//! idiom rather than depending on an `lru` crate.

use crate::crypto::{random, secretbox};
use crate::error::{CoreError, CoreResult};
use crate::time::current_time_millis;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use zeroize::Zeroize;

pub const DEFAULT_CACHE_CAPACITY: usize = 100;
pub const DEFAULT_CACHE_TTL_MS: u64 = 10 * 60 * 1000;

pub type ChatKey = [u8; 32];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    pub created_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBody {
    pub version: u8,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEnvelope {
    pub encrypted_chat_key: Vec<u8>,
    pub chat_key_nonce: Vec<u8>,
    pub encrypted_title: Vec<u8>,
    pub title_nonce: Vec<u8>,
    pub encrypted_body: Vec<u8>,
    pub body_nonce: Vec<u8>,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Seal a chat: generate (or reuse) a chat key, wrap it under the master
/// key, seal the title and a versioned `ChatBody` under the chat key.
pub fn seal_chat(
    master_key: &[u8; 32],
    chat_key: Option<ChatKey>,
    title: &str,
    messages: Vec<ChatMessage>,
    created_at: u64,
) -> CoreResult<(ChatEnvelope, ChatKey)> {
    let chat_key: ChatKey = match chat_key {
        Some(k) => k,
        None => random(32)?
            .try_into()
            .map_err(|_| CoreError::InvalidKeyLength { expected: 32, actual: 0 })?,
    };

    let (encrypted_chat_key, chat_key_nonce) = secretbox::aead_seal(master_key, &chat_key)?;
    let (encrypted_title, title_nonce) = secretbox::aead_seal(&chat_key, title.as_bytes())?;

    let body = ChatBody { version: 1, messages };
    let body_json = serde_json::to_vec(&body).map_err(|e| CoreError::MalformedEnvelope(e.to_string()))?;
    let (encrypted_body, body_nonce) = secretbox::aead_seal(&chat_key, &body_json)?;

    let now = current_time_millis();
    Ok((
        ChatEnvelope {
            encrypted_chat_key,
            chat_key_nonce: chat_key_nonce.to_vec(),
            encrypted_title,
            title_nonce: title_nonce.to_vec(),
            encrypted_body,
            body_nonce: body_nonce.to_vec(),
            created_at: if created_at == 0 { now } else { created_at },
            updated_at: now,
        },
        chat_key,
    ))
}

/// Open a sealed envelope. Fails `MalformedEnvelope` (wrapped into
/// `DecryptionFailed`-shaped `AeadAuthFailure` by the AEAD itself) on any
/// AEAD error.
pub fn open_chat(master_key: &[u8; 32], envelope: &ChatEnvelope) -> CoreResult<(ChatKey, String, ChatBody)> {
    let chat_key_nonce: [u8; 24] = envelope
        .chat_key_nonce
        .clone()
        .try_into()
        .map_err(|_| CoreError::MalformedEnvelope("bad chat_key_nonce length".into()))?;
    let chat_key_bytes = secretbox::aead_open(master_key, &envelope.encrypted_chat_key, &chat_key_nonce)?;
    let chat_key: ChatKey = chat_key_bytes
        .try_into()
        .map_err(|_| CoreError::MalformedEnvelope("unwrapped chat key wrong length".into()))?;

    let title_bytes = secretbox::aead_open(&chat_key, &envelope.encrypted_title, &envelope.title_nonce)?;
    let title = String::from_utf8(title_bytes).map_err(|e| CoreError::MalformedEnvelope(e.to_string()))?;

    let body_bytes = secretbox::aead_open(&chat_key, &envelope.encrypted_body, &envelope.body_nonce)?;
    let body: ChatBody =
        serde_json::from_slice(&body_bytes).map_err(|e| CoreError::MalformedEnvelope(e.to_string()))?;

    Ok((chat_key, title, body))
}

struct CacheEntry {
    key: ChatKey,
    inserted_at: u64,
    expires_at: u64,
}

impl Zeroize for CacheEntry {
    fn zeroize(&mut self) {
        self.key.zeroize();
    }
}

/// Bounded LRU + per-entry TTL cache for unwrapped chat keys. Writes are
/// serialized by the caller holding `&mut self` — matches §5's "writes are
/// serialized" ordering guarantee.
pub struct ChatKeyCache {
    entries: HashMap<String, CacheEntry>,
    capacity: usize,
    ttl_ms: u64,
}

impl ChatKeyCache {
    pub fn new(capacity: usize, ttl_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            ttl_ms,
        }
    }

    /// Returns `None` on miss or expiry; expired entries are evicted on
    /// access.
    pub fn get(&mut self, chat_id: &str, now_ms: u64) -> Option<ChatKey> {
        let expired = self.entries.get(chat_id).map(|e| now_ms >= e.expires_at).unwrap_or(false);
        if expired {
            self.entries.remove(chat_id);
            return None;
        }
        self.entries.get(chat_id).map(|e| e.key)
    }

    pub fn put(&mut self, chat_id: String, key: ChatKey, now_ms: u64) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&chat_id) {
            self.evict_one(now_ms);
        }
        self.entries.insert(
            chat_id,
            CacheEntry {
                key,
                inserted_at: now_ms,
                expires_at: now_ms + self.ttl_ms,
            },
        );
    }

    pub fn remove(&mut self, chat_id: &str) {
        self.entries.remove(chat_id);
    }

    /// Zeroizes every stored copy. MUST be called whenever
    /// `SecureSession -> Locked`.
    pub fn clear(&mut self) {
        for (_, mut entry) in self.entries.drain() {
            entry.zeroize();
        }
    }

    fn evict_one(&mut self, now_ms: u64) {
        // Remove expired entries first.
        let expired_key = self
            .entries
            .iter()
            .find(|(_, e)| now_ms >= e.expires_at)
            .map(|(k, _)| k.clone());
        if let Some(k) = expired_key {
            self.entries.remove(&k);
            return;
        }
        // Otherwise remove the least-recently-inserted.
        if let Some(oldest) = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.inserted_at)
            .map(|(k, _)| k.clone())
        {
            self.entries.remove(&oldest);
        }
    }
}

impl Drop for ChatKeyCache {
    fn drop(&mut self) {
        self.clear();
    }
}
