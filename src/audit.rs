//! Audit logging: security-relevant events recorded for an audit trail
//! without ever storing sensitive data. Backs Testable Property 9 — no log
//! line may contain bytes from a secret buffer.

use crate::time::current_time_millis;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// Hash an identifier for audit purposes (privacy-preserving: raw IDs
/// never reach the sink, only a short digest).
pub fn hash_for_audit(data: &[u8]) -> String {
    hex::encode(&Sha3_256::digest(data)[..8])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AuditEvent {
    SessionUnlocked,
    SessionLocked { reason: LockReason },
    DeviceRegistered { device_id_hash: String },
    RecoveryPerformed,
    HandshakeInitiated { channel_id_hash: String },
    HandshakeCompleted { channel_id_hash: String },
    HandshakeFailed { channel_id_hash: String, reason: String },
    AttestationRejected { reason: String },
    CredentialStored { provider_hash: String },
    CredentialDeleted { provider_hash: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockReason {
    Explicit,
    Idle,
    Background,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp_ms: u64,
    pub event: AuditEvent,
    pub context: Option<String>,
}

impl AuditEntry {
    pub fn new(event: AuditEvent, context: Option<String>) -> Self {
        Self {
            timestamp_ms: current_time_millis(),
            event,
            context,
        }
    }
}

/// Pluggable audit sink.
pub trait AuditSink: Send + Sync {
    fn log(&self, entry: AuditEntry);
}

/// In-memory sink, used by tests and by the scrubbing test (Property 9).
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: std::sync::Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self {
            entries: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn log(&self, entry: AuditEntry) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).push(entry);
    }
}

/// Default sink: forwards to `tracing` at `info`/`warn` as appropriate.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log(&self, entry: AuditEntry) {
        match &entry.event {
            AuditEvent::HandshakeFailed { .. } | AuditEvent::AttestationRejected { .. } => {
                tracing::warn!(event = ?entry.event, "onera_core audit event")
            }
            _ => tracing::info!(event = ?entry.event, "onera_core audit event"),
        }
    }
}
