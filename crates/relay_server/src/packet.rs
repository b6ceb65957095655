//! Wire packet definitions for peer-to-relay communication.
//!
//! Every packet carries a sender name, an ordered recipient list, and a
//! broadcast flag; the `body` distinguishes the handshake and notification
//! packets from opaque application traffic. Packets are plain serde values:
//! identity is structural, and a packet is consumed once by the routing step
//! and then discarded.

use serde::{Deserialize, Serialize};

/// Sender name used on every packet the relay originates itself.
pub const PROXY_SENDER: &str = "proxy";

/// Reason codes attached to `Error` packets before a peer is disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorReason {
    /// The relay does not accept connections from non-loopback addresses
    NoRemoteConnections,
    /// A packet arrived before the peer authenticated, or the
    /// authentication window elapsed
    NotAuthenticated,
    /// The authentication request carried bad or missing credentials
    InvalidAuthentication,
}

impl std::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorReason::NoRemoteConnections => "NO_REMOTE_CONNECTIONS",
            ErrorReason::NotAuthenticated => "NOT_AUTHENTICATED",
            ErrorReason::InvalidAuthentication => "INVALID_AUTHENTICATION",
        };
        f.write_str(name)
    }
}

/// The typed payload of a [`Packet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PacketBody {
    /// Handshake request: peer → relay
    Authentication {
        client_name: Option<String>,
        secret_key: Option<String>,
    },
    /// Handshake confirmation: relay → peer
    AuthenticationSuccess,
    /// Protocol violation notice: relay → peer
    Error { reason: ErrorReason },
    /// Fleet notification: a named peer authenticated
    ServerConnected { client_name: String },
    /// Fleet notification: a named peer disconnected
    ServerDisconnected { client_name: String },
    /// Opaque application traffic relayed between peers
    Application { payload: serde_json::Value },
}

impl PacketBody {
    /// Short packet-kind name for log output.
    pub fn kind(&self) -> &'static str {
        match self {
            PacketBody::Authentication { .. } => "Authentication",
            PacketBody::AuthenticationSuccess => "AuthenticationSuccess",
            PacketBody::Error { .. } => "Error",
            PacketBody::ServerConnected { .. } => "ServerConnected",
            PacketBody::ServerDisconnected { .. } => "ServerDisconnected",
            PacketBody::Application { .. } => "Application",
        }
    }
}

/// A typed message exchanged through the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Name of the peer (or `"proxy"`) that produced the packet
    #[serde(default)]
    pub sender: String,

    /// Ordered set of target peer names; materialized by the relay on
    /// broadcast
    #[serde(default)]
    pub recipients: Vec<String>,

    /// When true, the relay delivers to every authenticated peer except the
    /// sender
    #[serde(default)]
    pub broadcast: bool,

    /// The typed payload
    pub body: PacketBody,
}

impl Packet {
    /// Creates a packet with no sender, recipients, or broadcast flag set.
    pub fn new(body: PacketBody) -> Self {
        Self {
            sender: String::new(),
            recipients: Vec::new(),
            broadcast: false,
            body,
        }
    }

    /// Handshake request carrying the peer's name and the shared secret.
    pub fn authentication(
        client_name: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self::new(PacketBody::Authentication {
            client_name: Some(client_name.into()),
            secret_key: Some(secret_key.into()),
        })
    }

    /// Handshake confirmation.
    pub fn authentication_success() -> Self {
        Self::new(PacketBody::AuthenticationSuccess)
    }

    /// Protocol violation notice.
    pub fn error(reason: ErrorReason) -> Self {
        Self::new(PacketBody::Error { reason })
    }

    /// Notification that a peer authenticated.
    pub fn server_connected(client_name: impl Into<String>) -> Self {
        Self::new(PacketBody::ServerConnected {
            client_name: client_name.into(),
        })
    }

    /// Notification that a peer disconnected.
    pub fn server_disconnected(client_name: impl Into<String>) -> Self {
        Self::new(PacketBody::ServerDisconnected {
            client_name: client_name.into(),
        })
    }

    /// Opaque application traffic.
    pub fn application(payload: serde_json::Value) -> Self {
        Self::new(PacketBody::Application { payload })
    }

    /// Sets the sender name.
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Appends a recipient, ignoring duplicates (the list is an ordered
    /// set).
    pub fn add_recipient(mut self, recipient: impl Into<String>) -> Self {
        let recipient = recipient.into();
        if !self.recipients.contains(&recipient) {
            self.recipients.push(recipient);
        }
        self
    }

    /// Sets the broadcast flag.
    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }
}
