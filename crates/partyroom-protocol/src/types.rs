//! Core protocol types for Partyroom's wire format.
//!
//! Everything here is serialized with camelCase field names because the
//! lobby client reads them straight into JavaScript objects.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use partyroom_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Game types the lobby UI offers. The registry treats `gameType` as an
/// opaque string and accepts anything else too.
pub const KNOWN_GAME_TYPES: &[&str] = &["trivia", "truth-or-dare", "poll"];

/// Milliseconds since the Unix epoch, used for `createdAt`/`startedAt`.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The short code players type in to find a room, e.g. `"K3Z9QA"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps a code string as-is. Codes are compared exactly; no case
    /// folding happens here.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application-level user id, as issued by the auth layer.
///
/// Not to be confused with [`ConnectionId`]: a user keeps the same
/// `UserId` across reconnects while the connection changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `{id, name}` pair. Used for the room host and for `playerLeft`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Room snapshot
// ---------------------------------------------------------------------------

/// Lifecycle status of a room.
///
/// ```text
/// Waiting ──(startGame)──→ Active
/// ```
///
/// `Completed` is part of the wire vocabulary but nothing in the room
/// server moves a room there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Active,
    Completed,
}

impl RoomStatus {
    /// Returns `true` if moving to `target` is a legal forward step.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::Active) | (Self::Active, Self::Completed)
        )
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A player as held inside a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: UserId,
    pub name: String,
    /// The connection currently representing this player in this room.
    pub connection_ref: ConnectionId,
    /// Reserved for game logic; never set by the room server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

impl Player {
    pub fn new(id: UserId, name: impl Into<String>, connection_ref: ConnectionId) -> Self {
        Self {
            id,
            name: name.into(),
            connection_ref,
            score: None,
        }
    }

    /// The `{id, name}` part of this player.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Full room snapshot, sent with `roomCreated` and `roomState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_code: RoomCode,
    pub game_type: String,
    pub host: Identity,
    /// In join order.
    pub players: Vec<Player>,
    pub status: RoomStatus,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

impl Room {
    /// Looks up a player by user id.
    pub fn player(&self, id: &UserId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Commands a client can send.
///
/// Adjacently tagged: `{"event": "joinRoom", "data": {"roomCode": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientCommand {
    CreateRoom {
        game_type: String,
        user_id: UserId,
        user_name: String,
    },
    JoinRoom {
        room_code: RoomCode,
        user_id: UserId,
        user_name: String,
    },
    LeaveRoom {
        room_code: RoomCode,
        user_id: UserId,
        user_name: String,
    },
    GetRoomState {
        room_code: RoomCode,
    },
    StartGame {
        room_code: RoomCode,
    },
}

impl ClientCommand {
    /// The wire name of this command, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "createRoom",
            Self::JoinRoom { .. } => "joinRoom",
            Self::LeaveRoom { .. } => "leaveRoom",
            Self::GetRoomState { .. } => "getRoomState",
            Self::StartGame { .. } => "startGame",
        }
    }

    /// Rejects commands whose required fields are present but empty.
    ///
    /// Missing fields never get this far; they fail to decode.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::CreateRoom {
                game_type, user_id, ..
            } => {
                require("gameType", game_type)?;
                require("userId", user_id.as_str())
            }
            Self::JoinRoom {
                room_code, user_id, ..
            }
            | Self::LeaveRoom {
                room_code, user_id, ..
            } => {
                require("roomCode", room_code.as_str())?;
                require("userId", user_id.as_str())
            }
            Self::GetRoomState { room_code } | Self::StartGame { room_code } => {
                require("roomCode", room_code.as_str())
            }
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), ProtocolError> {
    if value.trim().is_empty() {
        return Err(ProtocolError::InvalidMessage(format!("{field} is required")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// To the creator: the new room.
    RoomCreated(Room),
    /// To a joiner or a `getRoomState` requester: the current room.
    RoomState(Room),
    /// To everyone else in the room: `{id, name, connectionRef}`.
    PlayerJoined(Player),
    /// To the remaining members: `{id, name}`.
    PlayerLeft(Identity),
    /// To the whole room.
    GameStarted { status: RoomStatus, started_at: u64 },
    /// To the requester only.
    Error { message: String },
}

impl ServerEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomCreated(_) => "roomCreated",
            Self::RoomState(_) => "roomState",
            Self::PlayerJoined(_) => "playerJoined",
            Self::PlayerLeft(_) => "playerLeft",
            Self::GameStarted { .. } => "gameStarted",
            Self::Error { .. } => "error",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
