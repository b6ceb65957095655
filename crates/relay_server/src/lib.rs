//! # Relay Server - Fleet Messaging Infrastructure
//!
//! The central relay of the Meridian messaging fabric. Independent server
//! instances (peers of a larger fleet) connect over TCP, authenticate with a
//! shared secret, and exchange typed packets addressed to named peers or
//! broadcast to everyone. The relay holds the authoritative registry of
//! connected peers and bridges every received application packet into the
//! in-process event bus, which is the only path from network input to
//! application logic.
//!
//! ## Architecture Overview
//!
//! * **Packet model** ([`packet`]) - serde-typed wire messages carrying
//!   sender, recipient list, and broadcast flag
//! * **Wire codec** ([`codec`]) - length-delimited JSON frames with a
//!   bounded frame size
//! * **Client registry** ([`connection`]) - the authoritative, lock-guarded
//!   map of pending and authenticated peers
//! * **Relay server** ([`server`]) - accept loop, per-connection tasks, the
//!   authentication state machine, and message routing
//!
//! ## Connection Lifecycle
//!
//! 1. A peer connects and is tracked as pending authentication
//! 2. Remote peers are rejected immediately when remote connections are
//!    disallowed
//! 3. The peer must authenticate within the configured window or it is
//!    kicked
//! 4. A valid `Authentication` packet names the peer, announces it to the
//!    already-authenticated fleet, and confirms with
//!    `AuthenticationSuccess`
//! 5. Every later packet is posted to the event bus as a
//!    [`PacketReceivedEvent`](events::PacketReceivedEvent)
//! 6. On disconnect the peer is removed and `ServerDisconnected` is
//!    broadcast to the remaining fleet
//!
//! ## Error Handling
//!
//! Protocol violations are answered with an `Error` packet before the
//! offending peer is disconnected; they are never fatal to the relay. A bind
//! failure prevents startup, and a fatal listener failure stops the accept
//! loop and disconnects every tracked peer. Per-connection I/O errors only
//! ever affect that connection.
//!
//! ## Thread Safety
//!
//! The registry is shared between the accept task, every connection task,
//! and the routing path, and is guarded by a `tokio::sync::RwLock`. Each
//! connection is served by its own task so one peer's failure degrades to
//! that peer's disconnect.

// Re-export core types and functions for easy access
pub use config::RelayConfig;
pub use error::RelayError;
pub use packet::{ErrorReason, Packet, PacketBody, PROXY_SENDER};
pub use server::RelayServer;

// Public module declarations
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod packet;
pub mod server;
