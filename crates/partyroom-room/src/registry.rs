//! The room registry: every live room, keyed by room code.
//!
//! All room state lives here, and so does the decision of which
//! connections belong to which broadcast group. Every operation first
//! finishes mutating `rooms`, collecting the resulting deliveries as
//! [`Effect`]s, and only then hands them to the [`Broadcaster`]. A
//! broadcast therefore never observes a half-applied change.

use std::collections::HashMap;

use partyroom_protocol::{
    ClientCommand, ConnectionId, Identity, KNOWN_GAME_TYPES, Player, Room, RoomCode,
    RoomStatus, ServerEvent, unix_millis,
};

use crate::{Broadcaster, CodeGenerator, EventSender, RandomCodes, RegistryConfig, RoomError};

/// A delivery or group change produced by an operation, applied after the
/// state change is complete.
#[derive(Debug)]
enum Effect {
    JoinGroup(ConnectionId, RoomCode),
    LeaveGroup(ConnectionId, RoomCode),
    ClearGroup(RoomCode),
    SendTo(ConnectionId, ServerEvent),
    Broadcast {
        room: RoomCode,
        event: ServerEvent,
        exclude: Option<ConnectionId>,
    },
}

/// Owns all rooms and their broadcast groups.
///
/// The registry is a plain single-owner struct: it assumes one caller at a
/// time. [`spawn_registry`](crate::spawn_registry) runs it inside a task so
/// concurrent connections are serialized through a channel.
///
/// Invariants upheld after every method returns:
/// - no room has two players with the same user id
/// - no room holds more than `config.max_players` players
/// - no empty room is registered
/// - room codes are unique
/// - a room's broadcast group is exactly the connections of its players
pub struct RoomRegistry<B> {
    rooms: HashMap<RoomCode, Room>,
    config: RegistryConfig,
    broadcaster: B,
    codes: Box<dyn CodeGenerator>,
}

impl<B: Broadcaster> RoomRegistry<B> {
    /// Creates an empty registry that draws random room codes.
    pub fn new(config: RegistryConfig, broadcaster: B) -> Self {
        Self::with_code_generator(config, broadcaster, RandomCodes)
    }

    /// Creates an empty registry with a custom code source.
    pub fn with_code_generator(
        config: RegistryConfig,
        broadcaster: B,
        codes: impl CodeGenerator,
    ) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            broadcaster,
            codes: Box::new(codes),
        }
    }

    /// Registers a freshly accepted connection's outbound channel.
    pub fn connect(&mut self, conn: ConnectionId, sender: EventSender) {
        self.broadcaster.attach(conn, sender);
        tracing::debug!(%conn, "connection attached");
    }

    /// Runs one client command on behalf of `conn`.
    ///
    /// Failures (`Room not found`, `Room is full`, validation errors) are
    /// reported to `conn` alone as an `error` event.
    pub fn dispatch(&mut self, conn: ConnectionId, command: ClientCommand) {
        let name = command.name();
        if let Err(e) = command.validate() {
            tracing::debug!(%conn, command = name, error = %e, "invalid command");
            self.reject(conn, e.to_string());
            return;
        }

        let result = match command {
            ClientCommand::CreateRoom {
                game_type,
                user_id,
                user_name,
            } => self
                .create_room(conn, game_type, Identity { id: user_id, name: user_name })
                .map(drop),
            ClientCommand::JoinRoom {
                room_code,
                user_id,
                user_name,
            } => self
                .join_room(conn, &room_code, Identity { id: user_id, name: user_name })
                .map(drop),
            ClientCommand::LeaveRoom {
                room_code,
                user_id,
                user_name,
            } => {
                self.leave_room(conn, &room_code, Identity { id: user_id, name: user_name });
                Ok(())
            }
            ClientCommand::GetRoomState { room_code } => {
                self.get_room_state(conn, &room_code).map(drop)
            }
            ClientCommand::StartGame { room_code } => {
                self.start_game(&room_code);
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::debug!(%conn, command = name, error = %e, "command rejected");
            self.reject(conn, e.to_string());
        }
    }

    /// Sends an `error` event to one connection.
    pub fn reject(&mut self, conn: ConnectionId, message: impl Into<String>) {
        self.broadcaster.send_to(
            conn,
            ServerEvent::Error {
                message: message.into(),
            },
        );
    }

    /// Creates a room hosted by `host`, who becomes its only player.
    ///
    /// Replies `roomCreated` to `conn`.
    ///
    /// # Errors
    /// [`RoomError::CodeSpaceExhausted`] if no free code turned up within
    /// `config.max_code_attempts` tries.
    pub fn create_room(
        &mut self,
        conn: ConnectionId,
        game_type: impl Into<String>,
        host: Identity,
    ) -> Result<Room, RoomError> {
        let room_code = self.allocate_code()?;
        let game_type = game_type.into();
        if !KNOWN_GAME_TYPES.contains(&game_type.as_str()) {
            tracing::debug!(%room_code, %game_type, "unrecognized game type");
        }

        let room = Room {
            room_code: room_code.clone(),
            game_type,
            players: vec![Player::new(host.id.clone(), host.name.clone(), conn)],
            host,
            status: RoomStatus::Waiting,
            created_at: unix_millis(),
        };
        self.rooms.insert(room_code.clone(), room.clone());
        tracing::info!(
            %room_code,
            host = %room.host.id,
            game_type = %room.game_type,
            "room created"
        );

        self.apply(vec![
            Effect::JoinGroup(conn, room_code),
            Effect::SendTo(conn, ServerEvent::RoomCreated(room.clone())),
        ]);
        Ok(room)
    }

    /// Adds `user` to a room, or re-points an existing member at `conn`.
    ///
    /// A new player triggers `playerJoined` to everyone else in the room;
    /// a rejoin changes no membership and notifies nobody else. Either way
    /// `conn` gets `roomState`.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if no such room exists
    /// - [`RoomError::RoomFull`] if the room is at capacity, checked before
    ///   the rejoin case
    pub fn join_room(
        &mut self,
        conn: ConnectionId,
        room_code: &RoomCode,
        user: Identity,
    ) -> Result<Room, RoomError> {
        let max_players = self.config.max_players;
        let room = self
            .rooms
            .get_mut(room_code)
            .ok_or_else(|| RoomError::NotFound(room_code.clone()))?;
        if room.players.len() >= max_players {
            return Err(RoomError::RoomFull(room_code.clone()));
        }

        let mut effects = Vec::with_capacity(3);

        if let Some(existing) = room.players.iter_mut().find(|p| p.id == user.id) {
            let previous = std::mem::replace(&mut existing.connection_ref, conn);
            if previous != conn && !room.players.iter().any(|p| p.connection_ref == previous) {
                effects.push(Effect::LeaveGroup(previous, room_code.clone()));
            }
            let snapshot = room.clone();
            tracing::info!(%room_code, user_id = %user.id, %conn, "player rejoined");

            effects.push(Effect::JoinGroup(conn, room_code.clone()));
            effects.push(Effect::SendTo(conn, ServerEvent::RoomState(snapshot.clone())));
            self.apply(effects);
            return Ok(snapshot);
        }

        let player = Player::new(user.id, user.name, conn);
        room.players.push(player.clone());
        let snapshot = room.clone();
        tracing::info!(
            %room_code,
            user_id = %player.id,
            players = snapshot.players.len(),
            "player joined"
        );

        effects.push(Effect::JoinGroup(conn, room_code.clone()));
        effects.push(Effect::Broadcast {
            room: room_code.clone(),
            event: ServerEvent::PlayerJoined(player),
            exclude: Some(conn),
        });
        effects.push(Effect::SendTo(conn, ServerEvent::RoomState(snapshot.clone())));
        self.apply(effects);
        Ok(snapshot)
    }

    /// Removes `user` from a room, deleting the room if that empties it.
    ///
    /// Both `conn` and the connection the player was on leave the room's
    /// group unless they still represent someone else in it. A deleted
    /// room's group is dropped.
    ///
    /// Tolerates stale requests: an unknown room or absent player changes
    /// nothing, but `playerLeft` is still sent to whoever is grouped under
    /// the code.
    pub fn leave_room(&mut self, conn: ConnectionId, room_code: &RoomCode, user: Identity) {
        let mut effects = Vec::with_capacity(3);
        let mut emptied = false;

        match self.rooms.get_mut(room_code) {
            Some(room) => {
                let removed = room.players.iter().position(|p| p.id == user.id);
                let removed = removed.map(|i| room.players.remove(i));
                if let Some(player) = &removed {
                    tracing::info!(
                        %room_code,
                        user_id = %player.id,
                        players = room.players.len(),
                        "player left"
                    );
                }

                let represents = |c: ConnectionId| room.players.iter().any(|p| p.connection_ref == c);
                if !represents(conn) {
                    effects.push(Effect::LeaveGroup(conn, room_code.clone()));
                }
                // The leaving player may have been on another connection.
                if let Some(player) = removed {
                    if player.connection_ref != conn && !represents(player.connection_ref) {
                        effects.push(Effect::LeaveGroup(player.connection_ref, room_code.clone()));
                    }
                }
                emptied = room.players.is_empty();
            }
            None => effects.push(Effect::LeaveGroup(conn, room_code.clone())),
        }

        if emptied {
            self.rooms.remove(room_code);
            tracing::info!(%room_code, "room deleted (empty)");
            effects.push(Effect::ClearGroup(room_code.clone()));
        }

        effects.push(Effect::Broadcast {
            room: room_code.clone(),
            event: ServerEvent::PlayerLeft(user),
            exclude: Some(conn),
        });
        self.apply(effects);
    }

    /// Replies `roomState` to `conn`.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no such room exists.
    pub fn get_room_state(
        &mut self,
        conn: ConnectionId,
        room_code: &RoomCode,
    ) -> Result<Room, RoomError> {
        let snapshot = self
            .rooms
            .get(room_code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_code.clone()))?;
        self.apply(vec![Effect::SendTo(
            conn,
            ServerEvent::RoomState(snapshot.clone()),
        )]);
        Ok(snapshot)
    }

    /// Marks a waiting room active and tells the whole room.
    ///
    /// `gameStarted` goes out even if the room is gone or already active;
    /// an empty group swallows it. Anyone may call this: the registry does
    /// not check that the caller is the host.
    pub fn start_game(&mut self, room_code: &RoomCode) {
        if let Some(room) = self.rooms.get_mut(room_code) {
            if room.status.can_transition_to(RoomStatus::Active) {
                room.status = RoomStatus::Active;
                tracing::info!(%room_code, players = room.players.len(), "game started");
            } else {
                tracing::debug!(%room_code, status = %room.status, "start on a room that is not waiting");
            }
        }

        self.apply(vec![Effect::Broadcast {
            room: room_code.clone(),
            event: ServerEvent::GameStarted {
                status: RoomStatus::Active,
                started_at: unix_millis(),
            },
            exclude: None,
        }]);
    }

    /// Cleans up after a connection that has gone away.
    ///
    /// Every player whose `connectionRef` is `conn` is removed, the rest of
    /// their room hears `playerLeft`, and rooms left empty are deleted.
    /// Finally the connection is detached from the broadcaster. A
    /// connection that never created or joined a room produces no events.
    pub fn handle_disconnect(&mut self, conn: ConnectionId) {
        let mut effects = Vec::new();
        let mut emptied = Vec::new();

        for (room_code, room) in &mut self.rooms {
            if !room.players.iter().any(|p| p.connection_ref == conn) {
                continue;
            }
            let (gone, kept): (Vec<Player>, Vec<Player>) = std::mem::take(&mut room.players)
                .into_iter()
                .partition(|p| p.connection_ref == conn);
            room.players = kept;

            for player in gone {
                tracing::info!(
                    %room_code,
                    user_id = %player.id,
                    %conn,
                    players = room.players.len(),
                    "player disconnected"
                );
                effects.push(Effect::Broadcast {
                    room: room_code.clone(),
                    event: ServerEvent::PlayerLeft(player.identity()),
                    exclude: Some(conn),
                });
            }
            effects.push(Effect::LeaveGroup(conn, room_code.clone()));
            if room.players.is_empty() {
                emptied.push(room_code.clone());
            }
        }

        for room_code in emptied {
            self.rooms.remove(&room_code);
            tracing::info!(%room_code, "room deleted (empty)");
            effects.push(Effect::ClearGroup(room_code));
        }

        self.apply(effects);
        self.broadcaster.detach(conn);
        tracing::debug!(%conn, "connection detached");
    }

    /// Returns the room registered under `room_code`, if any.
    pub fn room(&self, room_code: &RoomCode) -> Option<&Room> {
        self.rooms.get(room_code)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Codes of all live rooms, sorted.
    pub fn room_codes(&self) -> Vec<RoomCode> {
        let mut codes: Vec<RoomCode> = self.rooms.keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Read-only access to the broadcaster, e.g. to inspect groups.
    pub fn broadcaster(&self) -> &B {
        &self.broadcaster
    }

    /// Draws codes until one is not in use.
    fn allocate_code(&mut self) -> Result<RoomCode, RoomError> {
        let attempts = self.config.max_code_attempts;
        for attempt in 1..=attempts {
            let code = self.codes.generate(self.config.code_length);
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
            tracing::debug!(%code, attempt, "room code collision, regenerating");
        }
        tracing::warn!(attempts, rooms = self.rooms.len(), "no free room code found");
        Err(RoomError::CodeSpaceExhausted(attempts))
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::JoinGroup(conn, room) => self.broadcaster.join_group(conn, &room),
                Effect::LeaveGroup(conn, room) => self.broadcaster.leave_group(conn, &room),
                Effect::ClearGroup(room) => self.broadcaster.clear_group(&room),
                Effect::SendTo(conn, event) => self.broadcaster.send_to(conn, event),
                Effect::Broadcast {
                    room,
                    event,
                    exclude,
                } => self.broadcaster.broadcast(&room, event, exclude),
            }
        }
    }
}
