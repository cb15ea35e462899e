//! Server configuration.

use std::time::Duration;

use duoroom_room::{DEFAULT_MAX_NAME_LEN, RoomConfig};

/// Port the reference client expects.
pub const DEFAULT_PORT: u16 = 2567;

/// Settings for a [`DuoroomServer`](crate::DuoroomServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `"0.0.0.0:2567"`.
    pub bind_addr: String,
    /// How long an accepted peer may take to complete the WebSocket
    /// upgrade.
    pub handshake_timeout: Duration,
    /// How long a new connection may take to send its `join`.
    pub join_timeout: Duration,
    /// If set, a seated connection that sends nothing for this long is
    /// dropped, which counts as a departure. Off by default: a participant
    /// may take as long as they like over a move.
    pub idle_timeout: Option<Duration>,
    /// Bound on each room's command queue.
    pub command_buffer: usize,
}

impl ServerConfig {
    /// Defaults overridden by the `HOST` and `PORT` environment variables.
    ///
    /// An unparsable `PORT` is logged and ignored.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
                tracing::warn!(port = %raw, "invalid PORT, using default");
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };

        Self {
            bind_addr: format!("{host}:{port}"),
            ..Self::default()
        }
    }

    /// The per-room settings derived from this config.
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            command_buffer: self.command_buffer,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{DEFAULT_PORT}"),
            handshake_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
            idle_timeout: None,
            command_buffer: 64,
        }
    }
}
