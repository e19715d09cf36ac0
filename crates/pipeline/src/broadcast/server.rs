//! Push listener and fan-out
//!
//! `Broadcaster` owns the TCP listening endpoint and the subscriber
//! registry. The listener is a long-lived singleton: once bound it stays
//! up across monitoring target changes and is only torn down by a
//! rate-limit trip (via [`Broadcaster::clear`]); a later
//! [`Broadcaster::ensure_listening`] binds a fresh one.
//!
//! # Wire format
//!
//! Each published batch is one newline-terminated JSON array. Bytes sent
//! by subscribers are drained and ignored; there is no authentication.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use bidwatch_catalog::ResolvedBatch;

use crate::broadcast::registry::SubscriberRegistry;
use crate::error::{PipelineError, Result};
use crate::event::UiSender;

/// Default push port, fixed by the subscriber-side convention
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Broadcaster configuration
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Local address to listen on
    pub listen_addr: SocketAddr,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_LISTEN_PORT)),
        }
    }
}

/// Live listener bookkeeping
#[derive(Debug)]
struct ListenerState {
    addr: SocketAddr,
    cancel: CancellationToken,
}

/// Owns the subscriber registry and the push listening endpoint
pub struct Broadcaster {
    config: BroadcasterConfig,
    registry: Arc<SubscriberRegistry>,
    listener: Mutex<Option<ListenerState>>,
    ui: UiSender,
}

impl Broadcaster {
    /// Create a broadcaster; nothing is bound until
    /// [`Broadcaster::ensure_listening`]
    pub fn new(config: BroadcasterConfig, ui: UiSender) -> Self {
        Self {
            config,
            registry: Arc::new(SubscriberRegistry::new()),
            listener: Mutex::new(None),
            ui,
        }
    }

    /// The subscriber registry
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Bind the listening endpoint if it is not already up.
    ///
    /// Idempotent: an existing listener is reused, never reopened. Only an
    /// OS-level bind failure is an error; per the overall error policy it
    /// is the one startup failure that propagates.
    pub async fn ensure_listening(&self) -> Result<SocketAddr> {
        if let Some(state) = self.listener.lock().as_ref() {
            if !state.cancel.is_cancelled() {
                return Ok(state.addr);
            }
        }

        let listener =
            TcpListener::bind(self.config.listen_addr)
                .await
                .map_err(|e| PipelineError::Bind {
                    addr: self.config.listen_addr,
                    source: e,
                })?;
        let addr = listener.local_addr().map_err(|e| PipelineError::Bind {
            addr: self.config.listen_addr,
            source: e,
        })?;

        let cancel = CancellationToken::new();
        *self.listener.lock() = Some(ListenerState {
            addr,
            cancel: cancel.clone(),
        });

        info!(%addr, "push listener bound");
        self.ui.status(format!("Push listener bound on {addr}"));

        let registry = Arc::clone(&self.registry);
        let ui = self.ui.clone();
        tokio::spawn(accept_loop(listener, registry, ui, cancel));

        Ok(addr)
    }

    /// Serialize a batch once and deliver it to every current subscriber.
    ///
    /// A subscriber that cannot accept the frame is dropped; the rest
    /// still receive it. Returns the number of deliveries.
    pub fn publish(&self, batch: &ResolvedBatch) -> usize {
        let wire = match batch.to_wire() {
            Ok(wire) => wire,
            Err(e) => {
                error!(error = %e, "failed to serialize batch, not publishing");
                return 0;
            }
        };
        let frame: Arc<str> = Arc::from(format!("{wire}\n"));

        let delivered = self.registry.publish(frame);
        self.ui.status(format!(
            "Published {} item(s) to {} subscriber(s)",
            batch.len(),
            delivered
        ));
        delivered
    }

    /// Forcibly disconnect every subscriber and close the listener.
    ///
    /// Called exactly once per pipeline instance, by the rate limiter's
    /// trip transition.
    pub fn clear(&self) {
        let dropped = self.registry.clear();
        if let Some(state) = self.listener.lock().take() {
            state.cancel.cancel();
        }
        warn!(dropped, "push channel cleared, listener closed");
        self.ui.status(format!(
            "Disconnected {dropped} subscriber(s) and closed the push listener"
        ));
    }
}

/// Accept connections until cancelled
async fn accept_loop(
    listener: TcpListener,
    registry: Arc<SubscriberRegistry>,
    ui: UiSender,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("push listener shut down");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let (id, receiver) = match registry.connect(peer) {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!(%peer, error = %e, "rejecting subscriber");
                            ui.status(format!("Rejected subscriber {peer}: {e}"));
                            continue;
                        }
                    };
                    info!(%peer, id, "subscriber connected");
                    ui.status(format!("Subscriber connected from {peer}"));

                    let registry = Arc::clone(&registry);
                    let ui = ui.clone();
                    tokio::spawn(async move {
                        handle_subscriber(stream, id, peer, receiver, registry, ui).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept subscriber connection");
                }
            }
        }
    }
}

/// Per-connection writer task.
///
/// Writes queued frames to the socket; drains and ignores anything the
/// subscriber sends. Ends when the subscriber disconnects or the registry
/// drops this subscriber (its frame queue closes).
async fn handle_subscriber(
    stream: TcpStream,
    id: u64,
    peer: SocketAddr,
    mut receiver: mpsc::Receiver<Arc<str>>,
    registry: Arc<SubscriberRegistry>,
    ui: UiSender,
) {
    let (mut reader, mut writer) = stream.into_split();
    let mut drain = [0u8; 1024];

    loop {
        tokio::select! {
            frame = receiver.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = writer.write_all(frame.as_bytes()).await {
                        debug!(%peer, id, error = %e, "subscriber write failed");
                        break;
                    }
                }
                // Dropped from the registry (disconnect or clear)
                None => break,
            },
            read = reader.read(&mut drain) => match read {
                Ok(0) | Err(_) => break,
                Ok(n) => debug!(%peer, id, bytes = n, "ignoring data from subscriber"),
            }
        }
    }

    // Only report a disconnect we observed; if the registry already
    // dropped us (clear/prune), the status was reported there
    if registry.disconnect(id).is_ok() {
        info!(%peer, id, "subscriber disconnected");
        ui.status(format!("Subscriber {peer} disconnected"));
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
