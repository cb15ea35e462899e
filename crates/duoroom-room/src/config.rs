//! Room configuration.

use serde::{Deserialize, Serialize};

/// Longest display name kept, in characters.
pub const DEFAULT_MAX_NAME_LEN: usize = 32;

/// Per-room settings. Seat count is fixed at [`SEATS`](crate::SEATS).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Bounded capacity of the room actor's command channel. Senders
    /// wait when it is full.
    pub command_buffer: usize,

    /// Display names are trimmed and cut to this many characters.
    pub max_name_len: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            command_buffer: 64,
            max_name_len: DEFAULT_MAX_NAME_LEN,
        }
    }
}

impl RoomConfig {
    /// Resolves the name a participant is admitted under.
    ///
    /// Blank or missing names become `"Player N"`, where N counts the
    /// participants already seated plus one.
    pub fn display_name(&self, requested: Option<&str>, seated: usize) -> String {
        match requested.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.chars().take(self.max_name_len).collect(),
            None => format!("Player {}", seated + 1),
        }
    }
}
