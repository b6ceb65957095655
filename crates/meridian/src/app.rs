//! Main application logic and lifecycle management.
//!
//! This module contains the core `Application` struct that orchestrates
//! relay startup, monitoring, and graceful shutdown.

use crate::{cli::CliArgs, config::AppConfig, logging::display_banner, signals::setup_signal_handlers};
use meridian_event_system::{create_event_bus, EventBus, Listener, Subscription};
use relay_server::events::{ConnectionErrorEvent, PacketReceivedEvent};
use relay_server::RelayServer;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Main application struct managing the relay lifecycle.
///
/// The `Application` struct manages the complete lifecycle of the Meridian
/// relay, including configuration loading, event bus wiring, relay startup,
/// periodic health reporting, and graceful shutdown handling.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// The event bus receiving relay events
    event_bus: Arc<EventBus>,
    /// Relay server instance
    server: RelayServer,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// Loads configuration, applies CLI overrides, validates settings,
    /// wires the built-in traffic listener into the event bus, and
    /// constructs the relay.
    ///
    /// # Arguments
    ///
    /// * `args` - Parsed command-line arguments
    ///
    /// # Returns
    ///
    /// A configured `Application` instance ready to run, or an error if
    /// initialization failed.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        // Apply CLI overrides
        if let Some(bind_address) = args.bind_address {
            config.relay.bind_address = bind_address;
        }

        if let Some(secret_key) = args.secret_key {
            config.relay.secret_key = secret_key;
        }

        if args.accept_remote {
            config.relay.accept_remote_connections = true;
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        // Validate configuration
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        // Wire the bus and the built-in traffic listener before any peer can
        // connect.
        let event_bus = create_event_bus();
        event_bus.register(&Arc::new(TrafficLogListener));

        let server = RelayServer::new(config.to_relay_config()?, event_bus.clone());

        info!("🚀 Meridian Relay v{}", env!("CARGO_PKG_VERSION"));
        info!("🏗️ Architecture: Messaging Relay + Event Dispatcher");
        info!("📂 Config: {}", args.config_path.display());

        Ok(Self {
            config,
            event_bus,
            server,
        })
    }

    /// Runs the application until a shutdown signal arrives.
    ///
    /// Starts the relay, runs a periodic statistics task, waits for
    /// SIGINT/SIGTERM, then closes the relay and reports final dispatcher
    /// statistics.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the application ran and shut down successfully, or an
    /// error if there was a critical failure during execution.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Meridian Relay");
        self.log_configuration_summary();

        // A bind failure prevents startup entirely.
        let bound_addr = self.server.start().await?;

        // Periodic health reporting from dispatcher statistics.
        let monitoring_handle = {
            let event_bus = self.event_bus.clone();

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
                let mut last_events_posted = 0u64;

                loop {
                    interval.tick().await;

                    let stats = event_bus.stats();
                    let events_this_period = stats.events_posted - last_events_posted;
                    last_events_posted = stats.events_posted;

                    info!(
                        "📊 System Health - {} events/min | {} handlers | {} failures total",
                        events_this_period, stats.total_handlers, stats.handler_failures
                    );
                }
            })
        };

        info!("✅ Meridian Relay is now running!");
        info!("📡 Ready to accept peers on {}", bound_addr);
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        // Wait for shutdown signal
        setup_signal_handlers().await?;

        info!("🛑 Shutdown signal received, beginning graceful shutdown...");
        monitoring_handle.abort();
        self.server.close().await;

        // Display final statistics
        let final_stats = self.event_bus.stats();
        info!("📊 Final Statistics:");
        info!("  - Total events posted: {}", final_stats.events_posted);
        info!(
            "  - Handler invocations: {}",
            final_stats.handler_invocations
        );
        info!("  - Handler failures: {}", final_stats.handler_failures);

        info!("✅ Meridian Relay shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.relay.bind_address);
        info!(
            "  🔑 Remote connections: {}",
            if self.config.relay.accept_remote_connections {
                "accepted"
            } else {
                "loopback only"
            }
        );
        info!(
            "  ⏱️ Authentication window: {}ms",
            self.config.relay.auth_timeout_ms
        );
        info!(
            "  📦 Max frame size: {} bytes",
            self.config.relay.max_frame_size
        );
    }
}

/// Built-in listener that logs relayed traffic and reported peer errors.
struct TrafficLogListener;

impl Listener for TrafficLogListener {
    fn subscriptions(&self) -> Vec<Subscription> {
        vec![
            Subscription::new(0, "log_packets", |event: &PacketReceivedEvent| {
                debug!(
                    "📨 {} from '{}'",
                    event.packet.body.kind(),
                    event.client_name
                );
                Ok(())
            }),
            Subscription::new(0, "log_connection_errors", |event: &ConnectionErrorEvent| {
                warn!(
                    "peer at {}:{} reported {}",
                    event.address, event.port, event.reason
                );
                Ok(())
            }),
        ]
    }
}
