//! Events the relay posts into the dispatcher.
//!
//! These two events are the relay's entire surface toward application code:
//! every authenticated peer packet arrives as a [`PacketReceivedEvent`], and
//! `Error` packets surface as [`ConnectionErrorEvent`]s.

use crate::connection::ConnectionId;
use crate::packet::{ErrorReason, Packet};
use serde::{Deserialize, Serialize};

/// Posted for every packet an authenticated peer sends through the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketReceivedEvent {
    /// Identifies the connection that delivered the packet
    pub connection_id: ConnectionId,
    /// Authenticated name of the sending peer
    pub client_name: String,
    /// The received packet, unmodified
    pub packet: Packet,
    /// Unix timestamp when the packet was bridged into the bus
    pub timestamp: u64,
}

/// Posted when a peer reports an error packet on its connection.
///
/// Raising this event does not by itself close the connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionErrorEvent {
    /// The reason code carried by the error packet
    pub reason: ErrorReason,
    /// Remote address of the reporting connection
    pub address: String,
    /// Remote port of the reporting connection
    pub port: u16,
    /// Unix timestamp when the error was observed
    pub timestamp: u64,
}
