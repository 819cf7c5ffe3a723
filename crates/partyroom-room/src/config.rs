//! Registry configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`RoomRegistry`](crate::RoomRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum players allowed in one room.
    pub max_players: usize,

    /// Number of characters in a generated room code.
    pub code_length: usize,

    /// How many times to regenerate a room code that collides with a live
    /// room before giving up on `createRoom`.
    pub max_code_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_players: 10,
            code_length: 6,
            max_code_attempts: 32,
        }
    }
}
