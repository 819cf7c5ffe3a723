//! The fan-out seam between the registry and client connections.
//!
//! The registry decides *who* hears about a change; a [`Broadcaster`]
//! decides *how* it reaches them. [`ChannelBroadcaster`] delivers through
//! one unbounded Tokio channel per connection, drained by that
//! connection's writer task.

use std::collections::{BTreeSet, HashMap};

use partyroom_protocol::{ConnectionId, RoomCode, ServerEvent};
use tokio::sync::mpsc;

/// Channel sender for delivering events to one connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Delivers events to connections and tracks per-room broadcast groups.
///
/// Only the registry calls these methods; group membership is driven by
/// room membership and never by connections directly. Every method is
/// infallible: sends to a gone connection or an empty group are dropped.
pub trait Broadcaster: Send + 'static {
    /// Registers the outbound channel of a newly accepted connection.
    fn attach(&mut self, conn: ConnectionId, sender: EventSender);

    /// Forgets a connection and removes it from every group. After this
    /// the connection receives nothing.
    fn detach(&mut self, conn: ConnectionId);

    /// Delivers to exactly one connection.
    fn send_to(&mut self, conn: ConnectionId, event: ServerEvent);

    /// Delivers to every connection grouped under `room`, skipping
    /// `exclude` if given.
    fn broadcast(&mut self, room: &RoomCode, event: ServerEvent, exclude: Option<ConnectionId>);

    /// Adds a connection to a room's group.
    fn join_group(&mut self, conn: ConnectionId, room: &RoomCode);

    /// Removes a connection from a room's group.
    fn leave_group(&mut self, conn: ConnectionId, room: &RoomCode);

    /// Drops a room's group entirely. Called when the room is deleted.
    fn clear_group(&mut self, room: &RoomCode);
}

/// In-memory [`Broadcaster`] over per-connection mpsc channels.
#[derive(Debug, Default)]
pub struct ChannelBroadcaster {
    connections: HashMap<ConnectionId, EventSender>,
    groups: HashMap<RoomCode, BTreeSet<ConnectionId>>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections currently grouped under `room`, in id order.
    pub fn group_members(&self, room: &RoomCode) -> Vec<ConnectionId> {
        self.groups
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of attached connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn deliver(&self, conn: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.connections.get(&conn) {
            if sender.send(event).is_err() {
                tracing::trace!(%conn, "dropping event for closed connection");
            }
        }
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn attach(&mut self, conn: ConnectionId, sender: EventSender) {
        self.connections.insert(conn, sender);
    }

    fn detach(&mut self, conn: ConnectionId) {
        self.connections.remove(&conn);
        self.groups.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    fn send_to(&mut self, conn: ConnectionId, event: ServerEvent) {
        self.deliver(conn, event);
    }

    fn broadcast(&mut self, room: &RoomCode, event: ServerEvent, exclude: Option<ConnectionId>) {
        let Some(members) = self.groups.get(room) else {
            return;
        };
        for conn in members {
            if Some(*conn) != exclude {
                self.deliver(*conn, event.clone());
            }
        }
    }

    fn join_group(&mut self, conn: ConnectionId, room: &RoomCode) {
        self.groups.entry(room.clone()).or_default().insert(conn);
    }

    fn leave_group(&mut self, conn: ConnectionId, room: &RoomCode) {
        if let Some(members) = self.groups.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                self.groups.remove(room);
            }
        }
    }

    fn clear_group(&mut self, room: &RoomCode) {
        self.groups.remove(room);
    }
}
