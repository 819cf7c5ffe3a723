//! # Partyroom
//!
//! Room-presence server for browser party games.
//!
//! Clients connect over WebSocket and send JSON commands to create, join,
//! leave, inspect and start game rooms identified by short codes. The
//! server keeps every room in memory and pushes presence changes to the
//! other players in the room.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use partyroom::prelude::*;
//!
//! # async fn run() -> Result<(), PartyroomError> {
//! let server = PartyroomServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{DEFAULT_BIND_ADDR, ServerConfig};
pub use error::PartyroomError;
pub use server::{PartyroomServer, PartyroomServerBuilder};

/// Everything needed to run a server or talk to one in tests.
pub mod prelude {
    pub use crate::{PartyroomError, PartyroomServer, PartyroomServerBuilder, ServerConfig};
    pub use partyroom_protocol::{
        ClientCommand, Identity, Player, Room, RoomCode, RoomStatus, ServerEvent, UserId,
    };
    pub use partyroom_room::{RegistryConfig, RegistryHandle, RoomError};
}
