//! Authoritative registry of tracked peer connections.
//!
//! The registry is the single shared piece of mutable relay state: the
//! accept loop inserts, each connection's teardown path removes, and the
//! routing logic reads, concurrently, from different tasks. All access
//! goes through one `RwLock`; no component mutates the peer list without
//! it.

use super::{client::ClientConnection, ConnectionId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Central manager for all peer connections.
///
/// Tracks every accepted connection from socket accept to disconnect and
/// answers name lookups for routing. The registry invariant: an
/// authenticated connection always has a name, and that name is unique
/// among authenticated connections.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    /// Map of connection ID to tracked peer connection
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,

    /// Atomic counter for generating unique connection IDs
    next_id: AtomicUsize,
}

impl ClientRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Tracks a new connection and returns its unique ID.
    pub async fn add(&self, connection: Arc<ClientConnection>) -> ConnectionId {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections
            .write()
            .await
            .insert(connection_id, connection);
        connection_id
    }

    /// Stops tracking a connection, returning it if it was still tracked.
    pub async fn remove(&self, connection_id: ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.write().await.remove(&connection_id)
    }

    /// Looks up a connection by ID.
    pub async fn get(&self, connection_id: ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.read().await.get(&connection_id).cloned()
    }

    /// Resolves an authenticated peer by its unique name.
    pub async fn get_by_name(&self, client_name: &str) -> Option<Arc<ClientConnection>> {
        let connections = self.connections.read().await;
        connections
            .values()
            .find(|connection| {
                connection.is_authenticated()
                    && connection.client_name().as_deref() == Some(client_name)
            })
            .cloned()
    }

    /// Whether any authenticated peer already holds the given name.
    pub async fn is_name_taken(&self, client_name: &str) -> bool {
        self.get_by_name(client_name).await.is_some()
    }

    /// Snapshot of every authenticated peer.
    pub async fn authenticated(&self) -> Vec<Arc<ClientConnection>> {
        let connections = self.connections.read().await;
        connections
            .values()
            .filter(|connection| connection.is_authenticated())
            .cloned()
            .collect()
    }

    /// Removes and returns every tracked connection; used during shutdown.
    pub async fn drain(&self) -> Vec<Arc<ClientConnection>> {
        let mut connections = self.connections.write().await;
        connections.drain().map(|(_, connection)| connection).collect()
    }

    /// Number of tracked connections, pending or authenticated.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether the registry tracks no connections.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
