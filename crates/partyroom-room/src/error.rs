//! Error types for the room layer.

use partyroom_protocol::RoomCode;

/// Errors that can occur during room operations.
///
/// The `Display` text is what the client sees in `error.message`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No room is registered under this code.
    #[error("Room not found")]
    NotFound(RoomCode),

    /// The room already holds the maximum number of players.
    #[error("Room is full")]
    RoomFull(RoomCode),

    /// Every generated code collided with a live room.
    #[error("Could not allocate a room code after {0} attempts")]
    CodeSpaceExhausted(u32),

    /// The registry task has stopped or its command channel is closed.
    #[error("Room registry is unavailable")]
    Unavailable,
}
