//! Peer connection representation and lifecycle.
//!
//! A [`ClientConnection`] owns the write half of one peer socket plus the
//! peer's authentication state. It is created unauthenticated when the
//! socket is accepted, gains its unique `client_name` on a successful
//! handshake, and is torn down exactly once however the connection ends.

use crate::codec;
use crate::error::RelayError;
use crate::packet::{ErrorReason, Packet, PROXY_SENDER};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::SystemTime;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

/// Represents one peer connection, pending or authenticated.
///
/// The registry owns the connection while it is tracked; connection tasks
/// and the routing path hold it behind an `Arc` only for the duration of a
/// send or state check.
pub struct ClientConnection {
    /// The remote network address of the peer
    remote_addr: SocketAddr,

    /// When this connection was established
    connected_at: SystemTime,

    /// Peer name, set only after successful authentication
    client_name: RwLock<Option<String>>,

    /// Whether the handshake completed
    authenticated: AtomicBool,

    /// Guard so teardown runs once however the connection ends
    disconnected: AtomicBool,

    /// Write half of the socket; direct writes, no queueing, so a slow peer
    /// blocks its senders
    writer: Mutex<OwnedWriteHalf>,

    /// Signals the connection's read task to stop
    shutdown: watch::Sender<bool>,

    /// Frame-size bound shared with the codec
    max_frame_size: usize,
}

impl ClientConnection {
    /// Creates a new pending connection around an accepted socket's write
    /// half.
    pub fn new(remote_addr: SocketAddr, writer: OwnedWriteHalf, max_frame_size: usize) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            remote_addr,
            connected_at: SystemTime::now(),
            client_name: RwLock::new(None),
            authenticated: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
            writer: Mutex::new(writer),
            shutdown,
            max_frame_size,
        }
    }

    /// The peer's IP address.
    pub fn address(&self) -> IpAddr {
        self.remote_addr.ip()
    }

    /// The peer's source port.
    pub fn port(&self) -> u16 {
        self.remote_addr.port()
    }

    /// The full remote socket address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// When the socket was accepted.
    pub fn connected_at(&self) -> SystemTime {
        self.connected_at
    }

    /// Whether the handshake completed.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Marks the handshake state. The name must already be assigned when
    /// flipping to authenticated.
    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::Release);
    }

    /// The peer's authenticated name, if any.
    pub fn client_name(&self) -> Option<String> {
        self.client_name
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Assigns the peer's name during authentication.
    pub fn set_client_name(&self, name: impl Into<String>) {
        *self
            .client_name
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(name.into());
    }

    /// Name used for this connection in log output: the authenticated name
    /// or the remote address while pending.
    pub fn display_name(&self) -> String {
        self.client_name()
            .unwrap_or_else(|| self.remote_addr.to_string())
    }

    /// A receiver that resolves when the connection is being torn down;
    /// the read task selects on it.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Writes one packet directly to the peer.
    ///
    /// There is no send queue or backpressure; the call completes when the
    /// frame reaches the socket, so an unresponsive peer can block the
    /// caller.
    pub async fn send(&self, packet: &Packet) -> Result<(), RelayError> {
        if self.disconnected.load(Ordering::Acquire) {
            return Err(RelayError::Closed(self.display_name()));
        }
        let mut writer = self.writer.lock().await;
        codec::write_packet(&mut *writer, packet, self.max_frame_size).await
    }

    /// Sends an `Error` packet naming the reason, then disconnects.
    ///
    /// The error packet is written before the socket is torn down so the
    /// departing peer learns why it was dropped.
    pub async fn kick(&self, reason: ErrorReason) {
        debug!("{} was kicked ({})", self.display_name(), reason);
        let mut packet = Packet::error(reason).with_sender(PROXY_SENDER);
        if let Some(name) = self.client_name() {
            packet = packet.add_recipient(name);
        }
        if let Err(e) = self.send(&packet).await {
            warn!("failed to deliver kick reason to {}: {}", self.display_name(), e);
        }
        self.disconnect().await;
    }

    /// Tears the connection down: signals the read task and closes the
    /// write half. Idempotent; later calls are no-ops.
    pub async fn disconnect(&self) {
        if self.disconnected.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.shutdown.send(true);
        if let Err(e) = self.writer.lock().await.shutdown().await {
            debug!("error closing socket to {}: {}", self.display_name(), e);
        }
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("remote_addr", &self.remote_addr)
            .field("client_name", &self.client_name())
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
