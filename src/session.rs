//! `SecureSession` (spec §4.6): the in-memory key holder with idle and
//! background lock timers. Grounded on the teacher's `protocol/session.rs`
//! (`Session` state enum, `tracing::info!/warn!` at transitions, policy
//! objects checked by the caller rather than self-spawned timers).

use crate::crypto::secretbox;
use crate::error::{CoreError, CoreResult};
use crate::external::Clock;
use crate::time::current_time_millis;
use std::sync::RwLock;
use zeroize::Zeroize;

pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30 * 60 * 1000;
pub const DEFAULT_BACKGROUND_TIMEOUT_MS: u64 = 5 * 60 * 1000;

#[derive(Clone)]
struct UnlockedKeys {
    master_key: [u8; 32],
    secret_key: [u8; 32],
    public_key: [u8; 32],
    recovery_key: Option<[u8; 32]>,
    unlocked_at: u64,
    last_activity_at: u64,
}

impl Zeroize for UnlockedKeys {
    fn zeroize(&mut self) {
        self.master_key.zeroize();
        self.secret_key.zeroize();
        self.public_key.zeroize();
        if let Some(rk) = self.recovery_key.as_mut() {
            rk.zeroize();
        }
        self.recovery_key = None;
    }
}

enum SessionState {
    Locked,
    Unlocked(UnlockedKeys),
}

/// Configuration for the session's lock timers.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub idle_timeout_ms: u64,
    pub background_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            background_timeout_ms: DEFAULT_BACKGROUND_TIMEOUT_MS,
        }
    }
}

/// Single-writer coordinator for the session's sensitive buffers. Readers
/// receive access only through `with_*` closures: the closure runs while
/// the read lock is held, so a concurrent `lock()` cannot zeroize the
/// buffer mid-read (the "snapshot on access" strategy spec §4.6 allows),
/// and no raw borrow escapes beyond the closure's lifetime.
pub struct SecureSession {
    state: RwLock<SessionState>,
    config: SessionConfig,
    background_entered_at: RwLock<Option<u64>>,
}

impl SecureSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            state: RwLock::new(SessionState::Locked),
            config,
            background_entered_at: RwLock::new(None),
        }
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(*self.state.read().unwrap_or_else(|e| e.into_inner()), SessionState::Unlocked(_))
    }

    /// Transition `Locked -> Unlocked` on a successful unlock.
    pub fn unlock(
        &self,
        master_key: [u8; 32],
        secret_key: [u8; 32],
        public_key: [u8; 32],
        recovery_key: Option<[u8; 32]>,
        clock: &dyn Clock,
    ) {
        let now = clock.now_ms();
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = SessionState::Unlocked(UnlockedKeys {
            master_key,
            secret_key,
            public_key,
            recovery_key,
            unlocked_at: now,
            last_activity_at: now,
        });
        tracing::info!("onera_core session unlocked");
    }

    /// `Unlocked -> Locked`. Idempotent; zeroizes every held buffer.
    pub fn lock(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let SessionState::Unlocked(mut keys) = std::mem::replace(&mut *state, SessionState::Locked) {
            keys.zeroize();
            tracing::info!("onera_core session locked");
        }
    }

    pub fn record_activity(&self, clock: &dyn Clock) {
        let now = clock.now_ms();
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if let SessionState::Unlocked(keys) = &mut *state {
            keys.last_activity_at = now;
        }
    }

    /// Called periodically by the hosting runtime. Locks the session if
    /// the idle timeout has elapsed.
    pub fn check_idle_timeout(&self, clock: &dyn Clock) {
        let now = clock.now_ms();
        let should_lock = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            match &*state {
                SessionState::Unlocked(keys) => {
                    now.saturating_sub(keys.last_activity_at) >= self.config.idle_timeout_ms
                }
                SessionState::Locked => false,
            }
        };
        if should_lock {
            self.lock();
        }
    }

    /// "Entered background" runtime event: arm the background timer.
    pub fn enter_background(&self, clock: &dyn Clock) {
        *self.background_entered_at.write().unwrap_or_else(|e| e.into_inner()) = Some(clock.now_ms());
    }

    /// "Entering foreground" event: if the elapsed background time is at
    /// least the idle timeout, lock immediately; otherwise reset the idle
    /// timer (i.e. record activity) and disarm the background timer.
    pub fn enter_foreground(&self, clock: &dyn Clock) {
        let entered_at = self.background_entered_at.write().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(entered_at) = entered_at {
            let elapsed = clock.now_ms().saturating_sub(entered_at);
            if elapsed >= self.config.idle_timeout_ms {
                self.lock();
            } else {
                self.record_activity(clock);
            }
        }
    }

    /// Called periodically: locks if the background timer has exceeded
    /// `background_timeout_ms` while still in the background.
    pub fn check_background_timeout(&self, clock: &dyn Clock) {
        let entered_at = *self.background_entered_at.read().unwrap_or_else(|e| e.into_inner());
        if let Some(entered_at) = entered_at {
            if clock.now_ms().saturating_sub(entered_at) >= self.config.background_timeout_ms {
                self.lock();
            }
        }
    }

    pub fn with_master_key<R>(&self, f: impl FnOnce(&[u8; 32]) -> R) -> Option<R> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        match &*state {
            SessionState::Unlocked(keys) => Some(f(&keys.master_key)),
            SessionState::Locked => None,
        }
    }

    pub fn with_secret_key<R>(&self, f: impl FnOnce(&[u8; 32]) -> R) -> Option<R> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        match &*state {
            SessionState::Unlocked(keys) => Some(f(&keys.secret_key)),
            SessionState::Locked => None,
        }
    }

    pub fn public_key(&self) -> Option<[u8; 32]> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        match &*state {
            SessionState::Unlocked(keys) => Some(keys.public_key),
            SessionState::Locked => None,
        }
    }

    /// Convenience: seal `plaintext` under the master key, refreshing
    /// activity. `None` if locked.
    pub fn seal_with_master(&self, plaintext: &[u8], clock: &dyn Clock) -> Option<CoreResult<(Vec<u8>, [u8; 24])>> {
        let result = self.with_master_key(|mk| secretbox::aead_seal(mk, plaintext).map_err(CoreError::from))?;
        self.record_activity(clock);
        Some(result)
    }

    /// Last known activity timestamp, `None` if locked.
    pub fn last_activity_at(&self) -> Option<u64> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        match &*state {
            SessionState::Unlocked(keys) => Some(keys.last_activity_at),
            SessionState::Locked => None,
        }
    }

    pub fn unlocked_at(&self) -> Option<u64> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        match &*state {
            SessionState::Unlocked(keys) => Some(keys.unlocked_at),
            SessionState::Locked => None,
        }
    }
}

impl Drop for SecureSession {
    fn drop(&mut self) {
        self.lock();
    }
}

struct VirtualClock {
    now_ms: std::sync::atomic::AtomicU64,
}

impl VirtualClock {
    fn new(start_ms: u64) -> Self {
        Self {
            now_ms: std::sync::atomic::AtomicU64::new(start_ms),
        }
    }

    fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(std::sync::atomic::Ordering::SeqCst)
    }
}
