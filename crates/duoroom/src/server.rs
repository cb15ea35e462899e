//! `DuoroomServer` builder and server loop.
//!
//! This is the entry point for running a Duoroom server. It ties together
//! all the layers: transport → protocol → session → room.

use std::sync::Arc;
use std::time::Duration;

use duoroom_protocol::{Codec, JsonCodec};
use duoroom_room::SessionRegistry;
use duoroom_session::SessionManager;
use duoroom_transport::{PendingConnection, Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{DuoroomError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) registry: SessionRegistry,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Duoroom server.
///
/// # Example
///
/// ```rust,ignore
/// use duoroom::prelude::*;
///
/// let server = DuoroomServer::builder()
///     .bind("0.0.0.0:2567")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct DuoroomServerBuilder {
    config: ServerConfig,
}

impl DuoroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how long an accepted peer may take to finish the WebSocket
    /// upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets how long a connection may take to send `join`.
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.config.join_timeout = timeout;
        self
    }

    /// Drops seated connections that stay silent for `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// Sets the bound on each room's command queue.
    pub fn command_buffer(mut self, capacity: usize) -> Self {
        self.config.command_buffer = capacity;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<DuoroomServer<JsonCodec>, DuoroomError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new()),
            registry: SessionRegistry::new(self.config.room_config()),
            codec: JsonCodec,
            config: self.config,
        });

        Ok(DuoroomServer { transport, state })
    }
}

impl Default for DuoroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Duoroom server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DuoroomServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl DuoroomServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> DuoroomServerBuilder {
        DuoroomServerBuilder::new()
    }
}

impl<C: Codec> DuoroomServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop, spawning a task per accepted peer. The
    /// WebSocket handshake runs in that task, so a stalled peer never
    /// holds up the loop. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), DuoroomError> {
        match self.local_addr() {
            Ok(addr) => tracing::info!(%addr, "duoroom server running"),
            Err(_) => tracing::info!("duoroom server running"),
        }

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let conn_id = pending.id();
                        let conn = match tokio::time::timeout(
                            state.config.handshake_timeout,
                            pending.upgrade(),
                        )
                        .await
                        {
                            Ok(Ok(conn)) => conn,
                            Ok(Err(e)) => {
                                tracing::debug!(%conn_id, error = %e, "handshake failed");
                                return;
                            }
                            Err(_) => {
                                tracing::debug!(%conn_id, "handshake timed out");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                %conn_id,
                                error = %e,
                                "connection ended with error"
                            );
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
