//! `PartyroomServer` builder and accept loop.
//!
//! Ties the layers together: the WebSocket transport accepts TCP peers,
//! each peer gets a handler task that completes the upgrade, and every
//! handler talks to the one registry actor through a shared
//! [`RegistryHandle`].

use std::sync::Arc;
use std::time::Duration;

use partyroom_protocol::{Codec, JsonCodec};
use partyroom_room::{ChannelBroadcaster, RegistryConfig, RegistryHandle, RoomRegistry, spawn_registry};
use partyroom_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{PartyroomError, ServerConfig};

/// Capacity of the registry actor's command queue.
const REGISTRY_CHANNEL_SIZE: usize = 1024;

/// Shared state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: RegistryHandle,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a Partyroom server.
///
/// # Example
///
/// ```rust,no_run
/// use partyroom::prelude::*;
///
/// # async fn run() -> Result<(), PartyroomError> {
/// let server = PartyroomServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PartyroomServerBuilder {
    config: ServerConfig,
}

impl PartyroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets room capacity and code settings.
    pub fn registry_config(mut self, registry: RegistryConfig) -> Self {
        self.config.registry = registry;
        self
    }

    /// Closes connections that stay silent for `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// Binds the listener and starts the registry actor.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn build(self) -> Result<PartyroomServer<JsonCodec>, PartyroomError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let registry = RoomRegistry::new(self.config.registry, ChannelBroadcaster::new());
        let state = Arc::new(ServerState {
            registry: spawn_registry(registry, REGISTRY_CHANNEL_SIZE),
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
        });

        Ok(PartyroomServer { transport, state })
    }
}

impl Default for PartyroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Partyroom server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PartyroomServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl PartyroomServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> PartyroomServerBuilder {
        PartyroomServerBuilder::new()
    }
}

impl<C: Codec> PartyroomServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the room registry, for inspecting rooms from outside
    /// the connection handlers.
    pub fn registry(&self) -> RegistryHandle {
        self.state.registry.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(mut self) -> Result<(), PartyroomError> {
        tracing::info!("partyroom server running");

        loop {
            match self.transport.accept().await {
                Ok(incoming) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(incoming, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
