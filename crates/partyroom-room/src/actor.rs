//! Registry actor: one Tokio task that owns the [`RoomRegistry`].
//!
//! Connection handlers never touch the registry directly. They send
//! [`RegistryCommand`]s through a [`RegistryHandle`], and the actor applies
//! them one at a time, so every operation runs to completion before the
//! next one starts.

use partyroom_protocol::{ClientCommand, ConnectionId, Room, RoomCode};
use tokio::sync::{mpsc, oneshot};

use crate::{Broadcaster, EventSender, RoomError, RoomRegistry};

/// Commands sent to the registry actor through its channel.
pub(crate) enum RegistryCommand {
    /// Register a new connection's outbound channel.
    Connect {
        conn: ConnectionId,
        sender: EventSender,
    },

    /// A decoded client command from `conn`.
    Client {
        conn: ConnectionId,
        command: ClientCommand,
    },

    /// The connection is gone.
    Disconnect { conn: ConnectionId },

    /// Snapshot of a single room.
    GetRoom {
        room_code: RoomCode,
        reply: oneshot::Sender<Option<Room>>,
    },

    /// Number of live rooms.
    RoomCount { reply: oneshot::Sender<usize> },

    /// Stop the actor.
    Shutdown,
}

/// Handle to a running registry actor.
///
/// Cheap to clone: it's an `mpsc::Sender` wrapper. Each connection
/// handler holds one.
#[derive(Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Registers a connection so events can reach it.
    pub async fn connect(&self, conn: ConnectionId, sender: EventSender) -> Result<(), RoomError> {
        self.send(RegistryCommand::Connect { conn, sender }).await
    }

    /// Queues a client command (fire-and-forget; replies travel over the
    /// connection's event channel).
    pub async fn submit(&self, conn: ConnectionId, command: ClientCommand) -> Result<(), RoomError> {
        self.send(RegistryCommand::Client { conn, command }).await
    }

    /// Reports that a connection has closed.
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.send(RegistryCommand::Disconnect { conn }).await
    }

    /// Returns a snapshot of one room, or `None` if it doesn't exist.
    pub async fn room(&self, room_code: RoomCode) -> Result<Option<Room>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RegistryCommand::GetRoom {
            room_code,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Returns the number of live rooms.
    pub async fn room_count(&self) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RegistryCommand::RoomCount { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Tells the actor to stop. Queued commands ahead of this still run.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RegistryCommand::Shutdown).await
    }

    async fn send(&self, cmd: RegistryCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable)
    }
}

struct RegistryActor<B> {
    registry: RoomRegistry<B>,
    receiver: mpsc::Receiver<RegistryCommand>,
}

impl<B: Broadcaster> RegistryActor<B> {
    async fn run(mut self) {
        tracing::info!("room registry started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RegistryCommand::Connect { conn, sender } => {
                    self.registry.connect(conn, sender);
                }
                RegistryCommand::Client { conn, command } => {
                    self.registry.dispatch(conn, command);
                }
                RegistryCommand::Disconnect { conn } => {
                    self.registry.handle_disconnect(conn);
                }
                RegistryCommand::GetRoom { room_code, reply } => {
                    let _ = reply.send(self.registry.room(&room_code).cloned());
                }
                RegistryCommand::RoomCount { reply } => {
                    let _ = reply.send(self.registry.room_count());
                }
                RegistryCommand::Shutdown => {
                    tracing::info!(rooms = self.registry.room_count(), "room registry shutting down");
                    break;
                }
            }
        }

        tracing::info!("room registry stopped");
    }
}

/// Moves `registry` into a new task and returns a handle to it.
///
/// `channel_size` bounds the command queue; when it is full, callers wait.
pub fn spawn_registry<B: Broadcaster>(
    registry: RoomRegistry<B>,
    channel_size: usize,
) -> RegistryHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let actor = RegistryActor {
        registry,
        receiver: rx,
    };
    tokio::spawn(actor.run());
    RegistryHandle { sender: tx }
}
