//! Room presence for Partyroom.
//!
//! Keeps the in-memory set of game rooms, who is in each, and which
//! connections should hear about changes to them.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: the rooms and every create/join/leave/start/
//!   disconnect transition
//! - [`Broadcaster`]: per-connection and per-room delivery seam;
//!   [`ChannelBroadcaster`] is the in-memory implementation
//! - [`RegistryHandle`]: talks to a registry running in its own task
//!   (see [`spawn_registry`])
//! - [`RegistryConfig`]: capacity and room-code settings

mod actor;
mod broadcast;
mod code;
mod config;
mod error;
mod registry;

pub use actor::{RegistryHandle, spawn_registry};
pub use broadcast::{Broadcaster, ChannelBroadcaster, EventSender};
pub use code::{CodeGenerator, ROOM_CODE_ALPHABET, RandomCodes, random_code};
pub use config::RegistryConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
