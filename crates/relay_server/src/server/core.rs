//! Core relay server implementation.
//!
//! This module contains the main `RelayServer` struct: binding the listening
//! socket, running the accept loop on its own task, routing packets between
//! authenticated peers, and coordinating shutdown.

use crate::{
    config::RelayConfig,
    connection::ClientRegistry,
    error::RelayError,
    packet::Packet,
    server::handlers::handle_connection,
};
use meridian_event_system::EventBus;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// The central relay of a fleet: accepts peer connections, authenticates
/// them against the configured shared secret, and routes packets between
/// them.
///
/// The relay holds no application logic: received packets are handed to
/// application code exclusively through the [`EventBus`] it was constructed
/// with. Configuration is injected per instance so several relays can run
/// in one process (tests bind port 0).
pub struct RelayServer {
    /// Relay configuration settings
    config: Arc<RelayConfig>,

    /// The authoritative registry of tracked peers
    registry: Arc<ClientRegistry>,

    /// The dispatcher that receives packet and connection-error events
    event_bus: Arc<EventBus>,

    /// Address actually bound, recorded at startup (port 0 resolves here)
    local_addr: std::sync::Mutex<Option<SocketAddr>>,

    /// Handle of the accept-loop task
    accept_task: Mutex<Option<JoinHandle<()>>>,

    /// Signals the accept loop to stop
    shutdown: watch::Sender<bool>,

    /// Guard making [`close`](RelayServer::close) idempotent
    closed: AtomicBool,
}

impl RelayServer {
    /// Creates a relay with the given configuration and event bus.
    ///
    /// The relay is inert until [`start`](RelayServer::start) is called.
    pub fn new(config: RelayConfig, event_bus: Arc<EventBus>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config: Arc::new(config),
            registry: Arc::new(ClientRegistry::new()),
            event_bus,
            local_addr: std::sync::Mutex::new(None),
            accept_task: Mutex::new(None),
            shutdown,
            closed: AtomicBool::new(false),
        }
    }

    /// Binds the listening socket and starts the accept loop.
    ///
    /// Returns the bound address (useful when the configured port is 0). A
    /// bind failure is reported as [`RelayError::Bind`] and the loop never
    /// starts.
    pub async fn start(&self) -> Result<SocketAddr, RelayError> {
        let addr = self.config.bind_address;
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket
            .bind(addr)
            .map_err(|source| RelayError::Bind { addr, source })?;
        let listener = socket
            .listen(self.config.accept_backlog)
            .map_err(|source| RelayError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        *self
            .local_addr
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(local_addr);
        info!("🌐 Relay listening on {}", local_addr);

        let task = tokio::spawn(accept_loop(
            listener,
            self.registry.clone(),
            self.event_bus.clone(),
            self.config.clone(),
            self.shutdown.subscribe(),
        ));
        *self.accept_task.lock().await = Some(task);

        Ok(local_addr)
    }

    /// Routes a packet to its recipients.
    ///
    /// * **Broadcast** (`packet.broadcast`): the recipient list is
    ///   repopulated with the names of every authenticated peer (the
    ///   sender's own name included, as bookkeeping) and the packet is
    ///   delivered to every authenticated peer except the sender.
    /// * **Addressed**: each named recipient is resolved against the
    ///   registry; unresolvable names are logged and pruned from the list,
    ///   and every remaining recipient receives the packet.
    ///
    /// Delivery is a direct write per peer; failures are logged and do not
    /// abort delivery to other recipients.
    pub async fn send(&self, packet: &mut Packet) {
        if packet.broadcast {
            let peers = self.registry.authenticated().await;
            packet.recipients = peers
                .iter()
                .filter_map(|peer| peer.client_name())
                .collect();
            for peer in peers {
                if peer.client_name().as_deref() == Some(packet.sender.as_str()) {
                    continue;
                }
                if let Err(e) = peer.send(packet).await {
                    warn!(
                        "failed to deliver {} broadcast to {}: {}",
                        packet.body.kind(),
                        peer.display_name(),
                        e
                    );
                }
            }
        } else {
            let mut resolved = Vec::new();
            let mut kept = Vec::new();
            for recipient in packet.recipients.drain(..) {
                match self.registry.get_by_name(&recipient).await {
                    Some(connection) => {
                        resolved.push(connection);
                        kept.push(recipient);
                    }
                    None => warn!(
                        "unknown recipient ({}) for {} sent by {}",
                        recipient,
                        packet.body.kind(),
                        packet.sender
                    ),
                }
            }
            packet.recipients = kept;
            for connection in resolved {
                if let Err(e) = connection.send(packet).await {
                    warn!(
                        "failed to deliver {} to {}: {}",
                        packet.body.kind(),
                        connection.display_name(),
                        e
                    );
                }
            }
        }
    }

    /// Stops the relay: ends the accept loop, disconnects every tracked
    /// peer directly (no kick packet), and drops the listening socket.
    ///
    /// Idempotent; a second call is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("🛑 Relay shutting down");
        let _ = self.shutdown.send(true);
        disconnect_all(&self.registry).await;
        if let Some(task) = self.accept_task.lock().await.take() {
            task.abort();
        }
        info!("✅ Relay stopped");
    }

    /// The address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self
            .local_addr
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The peer registry.
    pub fn registry(&self) -> Arc<ClientRegistry> {
        self.registry.clone()
    }

    /// The event bus receiving relay events.
    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    /// The relay configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// Accept loop body. Transient accept errors keep the loop alive; a fatal
/// listener failure stops it and disconnects every tracked peer.
async fn accept_loop(
    listener: TcpListener,
    registry: Arc<ClientRegistry>,
    event_bus: Arc<EventBus>,
    config: Arc<RelayConfig>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    tokio::spawn(handle_connection(
                        stream,
                        addr,
                        registry.clone(),
                        event_bus.clone(),
                        config.clone(),
                    ));
                }
                Err(e) if is_transient_accept_error(&e) => {
                    warn!("transient accept error: {}", e);
                }
                Err(e) => {
                    error!("listening socket failed, stopping accept loop: {}", e);
                    disconnect_all(&registry).await;
                    break;
                }
            }
        }
    }
}

/// Directly disconnects and forgets every tracked connection.
pub(crate) async fn disconnect_all(registry: &ClientRegistry) {
    for connection in registry.drain().await {
        connection.disconnect().await;
    }
}

/// Per-accept failures that should not take the listener down.
fn is_transient_accept_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::WouldBlock
    )
}
