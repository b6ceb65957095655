//! Connection tracking for relay peers.
//!
//! This module handles the lifecycle of peer connections: per-peer state in
//! [`ClientConnection`] and the authoritative, concurrency-safe
//! [`ClientRegistry`] that the accept loop, every connection task, and the
//! routing path share.

pub mod client;
pub mod registry;

pub use client::ClientConnection;
pub use registry::ClientRegistry;

/// Type alias for connection identifiers.
///
/// Connection IDs are assigned on accept and identify a peer throughout its
/// lifecycle, before it has an authenticated name.
pub type ConnectionId = usize;
