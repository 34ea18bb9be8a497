//! `CoreContext`: the explicit, non-singleton owner of the one
//! `SecureSession`, the one `ChatKeyCache`, and every external-collaborator
//! handle. No global mutable state: the host application constructs one
//! `CoreContext` and threads it through.

use crate::chat_envelope::{ChatKeyCache, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_MS};
use crate::external::{Clock, DeviceRegistry, KeyShareStore, PasskeyProvider, SystemClock};
use crate::secure_store::SecureStore;
use crate::session::{SecureSession, SessionConfig};
use std::sync::{Arc, Mutex};

/// Everything the core needs from the host application, gathered once at
/// startup. `CoreContext` owns the session and cache; it borrows the
/// external collaborators as `Arc<dyn _>` so the host can share them freely.
pub struct CoreContext {
    pub session: SecureSession,
    pub chat_key_cache: Mutex<ChatKeyCache>,
    pub secure_store: Arc<dyn SecureStore>,
    pub key_shares: Arc<dyn KeyShareStore>,
    pub devices: Arc<dyn DeviceRegistry>,
    pub passkeys: Arc<dyn PasskeyProvider>,
    pub clock: Arc<dyn Clock>,
}

/// Construction parameters; `clock` defaults to `SystemClock` in
/// `CoreContext::new` and only needs overriding in tests.
pub struct CoreContextConfig {
    pub session: SessionConfig,
    pub secure_store: Arc<dyn SecureStore>,
    pub key_shares: Arc<dyn KeyShareStore>,
    pub devices: Arc<dyn DeviceRegistry>,
    pub passkeys: Arc<dyn PasskeyProvider>,
}

impl CoreContext {
    pub fn new(config: CoreContextConfig) -> Self {
        Self {
            session: SecureSession::new(config.session),
            chat_key_cache: Mutex::new(ChatKeyCache::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_MS)),
            secure_store: config.secure_store,
            key_shares: config.key_shares,
            devices: config.devices,
            passkeys: config.passkeys,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Locks the session and clears the chat-key cache together, as §4.7
    /// requires whenever the session transitions to `Locked`.
    pub fn lock(&self) {
        self.session.lock();
        self.chat_key_cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn check_idle_timeout(&self) {
        let was_unlocked = self.session.is_unlocked();
        self.session.check_idle_timeout(self.clock.as_ref());
        if was_unlocked && !self.session.is_unlocked() {
            self.chat_key_cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }

    pub fn check_background_timeout(&self) {
        let was_unlocked = self.session.is_unlocked();
        self.session.check_background_timeout(self.clock.as_ref());
        if was_unlocked && !self.session.is_unlocked() {
            self.chat_key_cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }
}

impl Drop for CoreContext {
    fn drop(&mut self) {
        self.lock();
    }
}
