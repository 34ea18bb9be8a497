//! `CredentialVault` (spec §4.8): LLM-provider API keys, sealed/opened
//! exactly like a chat title, under the master key. Grounded on the
//! teacher's `storage.rs::EncryptedStorage` (context-as-AAD, per-id
//! envelope) pattern.
//!
//! Exposes only the seal/unseal transform (`store`/`fetch`); it holds no
//! rows and opens no connections. `list(provider rows)` and
//! `delete(provider)` are exactly `BlobStore::list`/`BlobStore::get` and
//! `BlobStore::delete` (§6) operating on the caller's persisted
//! `CredentialRow`s — there is nothing provider-credential-specific left
//! to do once the row is just ciphertext plus a provider tag, so this type
//! doesn't re-wrap those two collaborator calls.

use crate::crypto::secretbox;
use crate::error::CoreResult;
use crate::time::current_time_millis;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRow {
    pub provider: String,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub created_at: u64,
}

/// Decrypted credential. Caller MUST NOT retain this beyond a single
/// request; `Drop` zeroizes the buffer.
#[derive(ZeroizeOnDrop)]
pub struct DecryptedCredential {
    #[zeroize(skip)]
    pub provider: String,
    value: Vec<u8>,
}

impl DecryptedCredential {
    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }
}

impl std::fmt::Debug for DecryptedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DecryptedCredential({}, [REDACTED])", self.provider)
    }
}

/// In-memory model of the provider-keyed credential rows; actual
/// persistence is the caller's `BlobStore`. This type only owns the
/// seal/unseal transform so it stays testable without a transport.
pub struct CredentialVault;

impl CredentialVault {
    pub fn store(master_key: &[u8; 32], provider: &str, api_key: &[u8]) -> CoreResult<CredentialRow> {
        let (ciphertext, nonce) = secretbox::aead_seal(master_key, api_key)?;
        Ok(CredentialRow {
            provider: provider.to_string(),
            ciphertext,
            nonce: nonce.to_vec(),
            created_at: current_time_millis(),
        })
    }

    pub fn fetch(master_key: &[u8; 32], row: &CredentialRow) -> CoreResult<DecryptedCredential> {
        let value = secretbox::aead_open(master_key, &row.ciphertext, &row.nonce)?;
        Ok(DecryptedCredential {
            provider: row.provider.clone(),
            value,
        })
    }
}
