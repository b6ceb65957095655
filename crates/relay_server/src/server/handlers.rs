//! Per-connection handling: the read task, the authentication state
//! machine, and disconnect bookkeeping.
//!
//! Each accepted socket is served by one task running [`handle_connection`]
//! from accept to teardown. A failure anywhere in a connection's processing
//! degrades to that connection's disconnect, never to the accept loop or
//! to other peers.

use crate::{
    codec,
    config::RelayConfig,
    connection::{ClientConnection, ClientRegistry, ConnectionId},
    events::{ConnectionErrorEvent, PacketReceivedEvent},
    packet::{ErrorReason, Packet, PacketBody, PROXY_SENDER},
};
use meridian_event_system::{current_timestamp, EventBus};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Serves a single peer connection from accept to cleanup.
///
/// # Connection Flow
///
/// 1. Track the connection in the registry (pending authentication)
/// 2. Kick non-loopback peers when remote connections are disallowed
/// 3. Arm the one-shot authentication timeout
/// 4. Read frames until the peer disconnects or is kicked, feeding each
///    packet to the authentication state machine
/// 5. Remove the connection and, if it was authenticated, broadcast
///    `ServerDisconnected` to the remaining fleet
pub(crate) async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<ClientRegistry>,
    event_bus: Arc<EventBus>,
    config: Arc<RelayConfig>,
) {
    let (reader, writer) = stream.into_split();
    let connection = Arc::new(ClientConnection::new(addr, writer, config.max_frame_size));
    let connection_id = registry.add(connection.clone()).await;
    info!("🔗 Connection {} from {}", connection_id, addr);

    // Remote policy applies before any handshake traffic is read.
    if rejects_remote_peer(&config, addr.ip()) {
        connection.kick(ErrorReason::NoRemoteConnections).await;
        finish_connection(connection_id, &connection, &registry).await;
        return;
    }

    // One-shot authentication window; still pending when it fires means the
    // peer is kicked through the same path as any protocol violation.
    let timeout_task = {
        let connection = connection.clone();
        let window = config.auth_timeout();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if !connection.is_authenticated() {
                connection.kick(ErrorReason::NotAuthenticated).await;
            }
        })
    };

    read_loop(
        reader,
        connection_id,
        &connection,
        &registry,
        &event_bus,
        &config,
    )
    .await;

    timeout_task.abort();
    finish_connection(connection_id, &connection, &registry).await;
}

/// Whether the remote-connection policy rejects a peer at this address
/// before any handshake traffic is processed.
pub(crate) fn rejects_remote_peer(config: &RelayConfig, ip: std::net::IpAddr) -> bool {
    !config.accept_remote_connections && !ip.is_loopback()
}

/// Reads frames until the connection shuts down or the stream ends.
async fn read_loop(
    mut reader: OwnedReadHalf,
    connection_id: ConnectionId,
    connection: &Arc<ClientConnection>,
    registry: &Arc<ClientRegistry>,
    event_bus: &Arc<EventBus>,
    config: &Arc<RelayConfig>,
) {
    let mut shutdown = connection.shutdown_signal();
    // Teardown may already have been signalled before this task subscribed
    // (e.g. an immediate kick); `changed()` only observes later sends.
    if *shutdown.borrow() {
        return;
    }
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            frame = codec::read_packet(&mut reader, config.max_frame_size) => match frame {
                Ok(packet) => {
                    handle_packet(connection_id, connection, packet, registry, event_bus, config).await;
                }
                Err(e) if e.is_clean_eof() => {
                    debug!("{} closed the connection", connection.display_name());
                    break;
                }
                Err(e) => {
                    warn!("read error on connection to {}: {}", connection.display_name(), e);
                    break;
                }
            }
        }
    }
}

/// The per-packet authentication state machine.
///
/// While pending, only a valid `Authentication` packet moves the connection
/// forward; anything else is a protocol violation answered with a coded
/// kick. Once authenticated, every non-`Error` packet is bridged into the
/// event bus; the sole path from network input to application logic.
async fn handle_packet(
    connection_id: ConnectionId,
    connection: &Arc<ClientConnection>,
    packet: Packet,
    registry: &Arc<ClientRegistry>,
    event_bus: &Arc<EventBus>,
    config: &Arc<RelayConfig>,
) {
    // Error packets raise an event in any state and never close the
    // connection by themselves.
    if let PacketBody::Error { reason } = &packet.body {
        debug!(
            "error packet from {}: {}",
            connection.display_name(),
            reason
        );
        event_bus.post(&ConnectionErrorEvent {
            reason: *reason,
            address: connection.address().to_string(),
            port: connection.port(),
            timestamp: current_timestamp(),
        });
        return;
    }

    if !connection.is_authenticated() {
        let PacketBody::Authentication {
            client_name,
            secret_key,
        } = &packet.body
        else {
            // First packet has to be an authentication request.
            connection.kick(ErrorReason::NotAuthenticated).await;
            return;
        };

        match (client_name.as_deref(), secret_key.as_deref()) {
            (Some(name), Some(secret))
                if !name.is_empty()
                    && secret == config.secret_key
                    && !registry.is_name_taken(name).await =>
            {
                authenticate(connection, name, registry).await;
            }
            _ => connection.kick(ErrorReason::InvalidAuthentication).await,
        }
        return;
    }

    trace!(
        "📨 {} from {}",
        packet.body.kind(),
        connection.display_name()
    );
    event_bus.post(&PacketReceivedEvent {
        connection_id,
        client_name: connection.client_name().unwrap_or_default(),
        packet,
        timestamp: current_timestamp(),
    });
}

/// Completes a successful handshake: assigns the name, announces the new
/// peer to the already-authenticated fleet, and confirms to the peer.
async fn authenticate(
    connection: &Arc<ClientConnection>,
    name: &str,
    registry: &Arc<ClientRegistry>,
) {
    connection.set_client_name(name);

    // Announce before flipping the flag so the snapshot holds only the
    // peers that were authenticated before this one.
    for peer in registry.authenticated().await {
        let announce = Packet::server_connected(name)
            .with_sender(PROXY_SENDER)
            .with_broadcast(true);
        if let Err(e) = peer.send(&announce).await {
            warn!(
                "failed to announce {} to {}: {}",
                name,
                peer.display_name(),
                e
            );
        }
    }

    connection.set_authenticated(true);
    let success = Packet::authentication_success()
        .with_sender(PROXY_SENDER)
        .add_recipient(name);
    if let Err(e) = connection.send(&success).await {
        warn!("failed to confirm authentication to {}: {}", name, e);
    }

    info!(
        "✅ Peer '{}' authenticated from {}",
        name,
        connection.remote_addr()
    );
}

/// Tears down a finished connection: removes it from the registry and, when
/// it was authenticated, broadcasts `ServerDisconnected` to every peer that
/// is still authenticated.
async fn finish_connection(
    connection_id: ConnectionId,
    connection: &Arc<ClientConnection>,
    registry: &Arc<ClientRegistry>,
) {
    // Gone already means the shutdown path owned the teardown.
    if registry.remove(connection_id).await.is_none() {
        return;
    }
    connection.disconnect().await;
    let uptime = connection.connected_at().elapsed().unwrap_or_default();
    info!(
        "❌ Connection {} from {} disconnected after {}s",
        connection_id,
        connection.remote_addr(),
        uptime.as_secs()
    );

    if !connection.is_authenticated() {
        return;
    }
    let Some(name) = connection.client_name() else {
        return;
    };
    for peer in registry.authenticated().await {
        let farewell = Packet::server_disconnected(&name)
            .with_sender(PROXY_SENDER)
            .with_broadcast(true);
        if let Err(e) = peer.send(&farewell).await {
            warn!(
                "failed to announce departure of {} to {}: {}",
                name,
                peer.display_name(),
                e
            );
        }
    }
}
