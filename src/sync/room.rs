//! Room bookkeeping for the relay.
//!
//! `RoomRegistry` is a plain state machine: each inbound event returns the
//! deliveries the caller must perform. It owns no sockets, so the join and
//! broadcast rules can be tested without a network.
//!
//! Rooms are created by their first joiner and live for the lifetime of the
//! process, even once empty.

use std::fmt;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::protocol::{ClientMessage, ServerMessage};

/// Relay-local connection handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// A message to send to one connection.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub message: ServerMessage,
}

#[derive(Clone, Debug)]
struct Room {
    password: String,
    /// Last pushed snapshot, `Null` before the first update.
    state: Value,
    /// Members in join order.
    members: Vec<ConnectionId>,
}

impl Room {
    fn broadcast(&self, message: &ServerMessage, out: &mut Vec<Delivery>) {
        out.extend(self.members.iter().map(|&to| Delivery {
            to,
            message: message.clone(),
        }));
    }

    fn count_message(&self) -> ServerMessage {
        ServerMessage::Players {
            count: self.members.len(),
        }
    }
}

/// All rooms known to one relay process.
#[derive(Clone, Debug, Default)]
pub struct RoomRegistry {
    rooms: FxHashMap<String, Room>,
    membership: FxHashMap<ConnectionId, String>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch a parsed client message.
    pub fn handle(&mut self, conn: ConnectionId, message: ClientMessage) -> Vec<Delivery> {
        match message {
            ClientMessage::Join { room, password, .. } => self.join(conn, &room, &password),
            ClientMessage::Update { state } => self.update(conn, state),
        }
    }

    /// Admit `conn` to `room`, creating it with `password` if unseen.
    ///
    /// A wrong password yields an `error` to `conn` only, and membership is
    /// untouched. On success `conn` leaves any previous room, receives
    /// `joined` with the current state, and every member (the joiner
    /// included) receives the new count.
    pub fn join(&mut self, conn: ConnectionId, room: &str, password: &str) -> Vec<Delivery> {
        let mut out = Vec::new();

        let entry = self.rooms.entry(room.to_owned()).or_insert_with(|| {
            info!(room, "room created");
            Room {
                password: password.to_owned(),
                state: Value::Null,
                members: Vec::new(),
            }
        });
        if entry.password != password {
            warn!(%conn, room, "join rejected: wrong password");
            out.push(Delivery {
                to: conn,
                message: ServerMessage::Error {
                    message: "Wrong password".to_owned(),
                },
            });
            return out;
        }

        out.extend(self.leave(conn));

        let Some(target) = self.rooms.get_mut(room) else {
            return out;
        };
        target.members.push(conn);
        self.membership.insert(conn, room.to_owned());

        out.push(Delivery {
            to: conn,
            message: ServerMessage::Joined {
                state: target.state.clone(),
            },
        });
        target.broadcast(&target.count_message(), &mut out);
        info!(%conn, room, members = target.members.len(), "joined room");
        out
    }

    /// Store `state` as the room's snapshot and rebroadcast it to every
    /// member, the sender included. Ignored if `conn` has not joined.
    pub fn update(&mut self, conn: ConnectionId, state: Value) -> Vec<Delivery> {
        let mut out = Vec::new();
        let Some(room) = self
            .membership
            .get(&conn)
            .and_then(|name| self.rooms.get_mut(name))
        else {
            debug!(%conn, "update before join ignored");
            return out;
        };
        room.state = state;
        room.broadcast(
            &ServerMessage::State {
                state: room.state.clone(),
            },
            &mut out,
        );
        out
    }

    /// Remove `conn` from its room and tell the remaining members.
    pub fn leave(&mut self, conn: ConnectionId) -> Vec<Delivery> {
        let mut out = Vec::new();
        let Some(name) = self.membership.remove(&conn) else {
            return out;
        };
        if let Some(room) = self.rooms.get_mut(&name) {
            room.members.retain(|&m| m != conn);
            room.broadcast(&room.count_message(), &mut out);
            info!(%conn, room = %name, members = room.members.len(), "left room");
        }
        out
    }

    /// Number of connections in `room` (0 if unknown).
    #[must_use]
    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, |r| r.members.len())
    }

    /// Last snapshot pushed to `room`.
    #[must_use]
    pub fn room_state(&self, room: &str) -> Option<&Value> {
        self.rooms.get(room).map(|r| &r.state)
    }

    #[must_use]
    pub fn room_of(&self, conn: ConnectionId) -> Option<&str> {
        self.membership.get(&conn).map(String::as_str)
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
