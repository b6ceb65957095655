//! Relay configuration types and defaults.
//!
//! Configuration is constructor-injected into each [`RelayServer`]
//! instance, so several relays (e.g. in tests) can run side by side without
//! sharing state.
//!
//! [`RelayServer`]: crate::server::RelayServer

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Default pending-connection backlog for the listening socket
fn default_accept_backlog() -> u32 {
    5
}

/// Default authentication window in milliseconds
fn default_auth_timeout_ms() -> u64 {
    4_000
}

/// Default maximum wire frame size in bytes
fn default_max_frame_size() -> usize {
    64 * 1024 // 64KB
}

/// Configuration structure for the relay server.
///
/// Contains all necessary parameters to configure relay behavior including
/// network settings, the shared authentication secret, and protocol limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// The socket address to bind the relay to
    pub bind_address: SocketAddr,

    /// Shared secret peers must present to authenticate
    pub secret_key: String,

    /// Whether peers from non-loopback addresses are accepted at all
    #[serde(default)]
    pub accept_remote_connections: bool,

    /// Pending-connection backlog for the listening socket
    #[serde(default = "default_accept_backlog")]
    pub accept_backlog: u32,

    /// How long a pending connection may stay unauthenticated, in
    /// milliseconds, before it is kicked
    #[serde(default = "default_auth_timeout_ms")]
    pub auth_timeout_ms: u64,

    /// Maximum size of a single wire frame in bytes
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

impl RelayConfig {
    /// The authentication window as a [`Duration`].
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8720".parse().expect("Invalid default bind address"),
            secret_key: String::new(),
            accept_remote_connections: false,
            accept_backlog: default_accept_backlog(),
            auth_timeout_ms: default_auth_timeout_ms(),
            max_frame_size: default_max_frame_size(),
        }
    }
}
