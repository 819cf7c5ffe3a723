//! Wire protocol for Partyroom.
//!
//! This crate defines what clients and the room server say to each other:
//!
//! - **Types** ([`ClientCommand`], [`ServerEvent`], [`Room`], [`Player`],
//!   etc.): the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those structures are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding or
//!   validating a command.
//!
//! Every message is an `{"event": "...", "data": {...}}` object with
//! camelCase fields, so browser clients can dispatch on `event` directly.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientCommand) → Room registry
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientCommand, Identity, KNOWN_GAME_TYPES, Player, Room, RoomCode, RoomStatus,
    ServerEvent, UserId, unix_millis,
};

/// Re-exported so protocol users don't need a direct transport dependency.
pub use partyroom_transport::ConnectionId;
