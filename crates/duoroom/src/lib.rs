//! # Duoroom
//!
//! Real-time server for two-player, turn-based sessions.
//!
//! Clients connect over WebSocket and send `join`. The server pairs them
//! two to a session, keeps the authoritative game state, and pushes a full
//! snapshot to both participants after every change. Illegal moves are
//! dropped without a reply.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duoroom::prelude::*;
//!
//! # async fn run() -> Result<(), DuoroomError> {
//! duoroom::init_tracing();
//! let server = DuoroomServer::builder()
//!     .config(ServerConfig::from_env())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{DEFAULT_PORT, ServerConfig};
pub use error::DuoroomError;
pub use server::{DuoroomServer, DuoroomServerBuilder};

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber that logs to stderr.
///
/// The filter comes from `RUST_LOG` and falls back to `info`. Calling this
/// more than once is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Everything needed to run a server or speak its protocol.
pub mod prelude {
    pub use crate::{
        DuoroomError, DuoroomServer, DuoroomServerBuilder, ServerConfig,
    };
    pub use duoroom_protocol::{
        Cell, ClientMessage, Codec, Envelope, JsonCodec, Marker, Outcome,
        ParticipantId, ParticipantInfo, Phase, RoomId, ServerMessage,
        StateSnapshot,
    };
    pub use duoroom_room::{RoomConfig, RoomInfo};
}
