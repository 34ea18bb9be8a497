//! `InferenceChannel` (spec §4.11): composes a duplex binary transport,
//! `AttestationVerifier`, and `NoiseNK` into `connect -> stream -> close`.
//! Grounded on the teacher's `protocol/session.rs` connection-lifecycle
//! shape (`Session` owning cipher state, single in-flight request) and the
//! `hxrts-aura` `noise.rs` initiator/responder split for how handshake
//! frames ride the transport.

use crate::attestation::AttestationVerifier;
use crate::error::{CoreError, CoreResult};
use crate::noise::{NoiseNkInitiator, TransportKeys};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// A duplex binary transport (e.g. a WebSocket). The host application
/// implements this; the core never opens sockets (§6).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&mut self, endpoint: &str) -> CoreResult<()>;
    async fn send_frame(&mut self, frame: &[u8]) -> CoreResult<()>;
    /// `None` signals an orderly close.
    async fn recv_frame(&mut self) -> CoreResult<Option<Vec<u8>>>;
    async fn close(&mut self) -> CoreResult<()>;
}

enum ChannelState {
    Idle,
    Connected { transport: Box<dyn Transport>, keys: TransportKeys },
    Closed,
}

/// Single-shot once closed: `connect` on an already-connected channel tears
/// down the old session first, but a channel that has been explicitly
/// closed cannot be reconnected.
pub struct InferenceChannel {
    state: Mutex<ChannelState>,
    closed_forever: AtomicBool,
}

impl InferenceChannel {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChannelState::Idle),
            closed_forever: AtomicBool::new(false),
        }
    }

    /// Verifies attestation, opens the transport, and performs the NK
    /// handshake over raw frames.
    pub async fn connect(
        &self,
        mut transport: Box<dyn Transport>,
        endpoint: &str,
        attestation_url: &str,
        verifier: &AttestationVerifier<'_>,
    ) -> CoreResult<()> {
        if self.closed_forever.load(Ordering::SeqCst) {
            return Err(CoreError::ChannelClosed);
        }
        self.teardown_existing().await;

        let report = verifier.verify(attestation_url).await?;
        transport.connect(endpoint).await?;

        let mut initiator = NoiseNkInitiator::new(report.server_static_pub_key);
        let msg1 = initiator.write_message1(&[])?;
        transport.send_frame(&msg1).await?;

        let msg2 = transport
            .recv_frame()
            .await?
            .ok_or_else(|| CoreError::NetworkError("connection closed during handshake".into()))?;
        let (_payload, keys) = initiator.read_message2(&msg2)?;

        let mut state = self.state.lock().await;
        *state = ChannelState::Connected { transport, keys };
        Ok(())
    }

    /// Encrypts and sends one request frame, then streams decrypted
    /// response frames until an empty frame or orderly close. The returned
    /// receiver buffers at most one in-flight decrypted frame.
    ///
    /// Takes `Arc<Self>` rather than `&self`: the pump that drains
    /// `recv_frame` into the channel runs as its own spawned task so a
    /// multi-frame response can't deadlock against a caller that hasn't
    /// started reading `rx` yet, and that task needs an owned handle that
    /// outlives this call.
    pub async fn send_and_stream(self: Arc<Self>, request_bytes: &[u8]) -> CoreResult<mpsc::Receiver<CoreResult<Vec<u8>>>> {
        let ciphertext = {
            let mut state = self.state.lock().await;
            match &mut *state {
                ChannelState::Connected { keys, .. } => keys.encrypt(request_bytes)?,
                _ => return Err(CoreError::ChannelClosed),
            }
        };

        {
            let mut state = self.state.lock().await;
            if let ChannelState::Connected { transport, .. } = &mut *state {
                transport.send_frame(&ciphertext).await?;
            } else {
                return Err(CoreError::ChannelClosed);
            }
        }

        let (tx, rx) = mpsc::channel(1);
        let pump_handle = self.clone();
        tokio::spawn(async move {
            loop {
                let frame = {
                    let mut state = pump_handle.state.lock().await;
                    match &mut *state {
                        ChannelState::Connected { transport, .. } => transport.recv_frame().await,
                        _ => Err(CoreError::ChannelClosed),
                    }
                };

                let frame = match frame {
                    Ok(Some(f)) => f,
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                };
                if frame.is_empty() {
                    break;
                }

                let decrypted = {
                    let mut state = pump_handle.state.lock().await;
                    match &mut *state {
                        ChannelState::Connected { keys, .. } => keys.decrypt(&frame),
                        _ => Err(CoreError::ChannelClosed),
                    }
                };

                match decrypted {
                    Ok(plaintext) => {
                        if tx.send(Ok(plaintext)).await.is_err() {
                            // Receiver dropped: consumer cancelled the stream.
                            pump_handle.close().await.ok();
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                }
            }
        });
        Ok(rx)
    }

    /// Closes the transport and zeroizes cipher state. Idempotent; once
    /// closed the channel cannot be reconnected.
    pub async fn close(&self) -> CoreResult<()> {
        self.teardown_existing().await;
        self.closed_forever.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn teardown_existing(&self) {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut *state, ChannelState::Closed)
        };
        if let ChannelState::Connected { mut transport, .. } = previous {
            let _ = transport.close().await;
        }
    }
}

impl Default for InferenceChannel {
    fn default() -> Self {
        Self::new()
    }
}
