//! Game state: the single authoritative aggregate.
//!
//! ## GameState
//!
//! Everything a room shares:
//! - Round and session counters
//! - Player rows (including the host flag)
//! - Live tickets and the shared dice pool
//! - Archived ticket lists of finished sessions
//!
//! The serde form of `GameState` is exactly the snapshot pushed through the
//! relay, so a client can replace its local copy wholesale with whatever
//! the room broadcasts.
//!
//! Tickets and dice are kept in `im` persistent structures: undo snapshots
//! are O(1) clones.

use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};

use super::config::GameRules;
use super::error::SnapshotError;
use super::player::{Player, PlayerId};
use super::rng::DIE_FACES;
use super::ticket::{Ticket, TicketId, TicketStatus, TicketType, PHASE_CAPACITY};

/// Remaining die capacity per player. Absent means no active die.
pub type DicePool = OrdMap<PlayerId, u8>;

/// One of the two play sessions.
///
/// Session 1 is individual work; session 2 adds helpers, the half-value
/// collaboration rule, and skips the `check` column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Session {
    #[default]
    First,
    Second,
}

impl Session {
    /// Whether the collaborative rules apply.
    #[must_use]
    pub const fn is_collaborative(self) -> bool {
        matches!(self, Session::Second)
    }

    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Session::First => 1,
            Session::Second => 2,
        }
    }
}

impl From<Session> for u8 {
    fn from(session: Session) -> Self {
        session.number()
    }
}

impl TryFrom<u8> for Session {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Session::First),
            2 => Ok(Session::Second),
            other => Err(format!("session must be 1 or 2, got {other}")),
        }
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session {}", self.number())
    }
}

/// Shared game state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Round within the session (1-based).
    pub round: u32,

    pub session: Session,

    /// Players in join order.
    pub players: Vec<Player>,

    /// Live tickets in creation order.
    pub tickets: Vector<Ticket>,

    pub is_game_started: bool,

    pub host_id: PlayerId,

    #[serde(default)]
    pub dice_values: DicePool,

    /// Tickets as they stood when session 1 ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session1_tickets: Option<Vector<Ticket>>,

    /// Tickets as they stood when session 2 ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session2_tickets: Option<Vector<Ticket>>,

    /// Next ticket id to hand out. Not part of the wire snapshot; rebuilt
    /// from the tickets seen whenever a remote snapshot is applied.
    #[serde(skip, default = "first_id")]
    next_ticket_id: u32,

    /// Next player id to hand out. Only ever grows until the lobby is
    /// reset, so a departed player's id is never given to a newcomer.
    #[serde(skip, default = "first_id")]
    next_player_id: u32,
}

fn first_id() -> u32 {
    1
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Lobby state: round 1 of session 1, nobody joined, not started.
    #[must_use]
    pub fn new() -> Self {
        Self {
            round: 1,
            session: Session::First,
            players: Vec::new(),
            tickets: Vector::new(),
            is_game_started: false,
            host_id: PlayerId::new(1),
            dice_values: DicePool::new(),
            session1_tickets: None,
            session2_tickets: None,
            next_ticket_id: first_id(),
            next_player_id: first_id(),
        }
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // === Players ===

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    #[must_use]
    pub fn is_host(&self, id: PlayerId) -> bool {
        self.host_id == id
    }

    /// Id the next joining player will get.
    #[must_use]
    pub fn next_player_id(&self) -> PlayerId {
        PlayerId::new(self.next_player_id)
    }

    /// Hand out the next player id.
    pub(crate) fn take_player_id(&mut self) -> PlayerId {
        let id = PlayerId::new(self.next_player_id);
        self.next_player_id = self.next_player_id.saturating_add(1);
        id
    }

    /// Clear every player's round-scoped dice fields.
    pub fn reset_round_flags(&mut self) {
        for player in &mut self.players {
            player.reset_round();
        }
    }

    // === Tickets ===

    #[must_use]
    pub fn ticket(&self, id: TicketId) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    pub fn ticket_mut(&mut self, id: TicketId) -> Option<&mut Ticket> {
        self.tickets.iter_mut().find(|t| t.id == id)
    }

    /// Create a `todo` ticket stamped with `created_round` and append it.
    pub fn push_ticket(&mut self, ticket_type: TicketType, created_round: u32) -> TicketId {
        let id = TicketId::new(self.next_ticket_id);
        self.next_ticket_id = self.next_ticket_id.saturating_add(1);
        self.tickets.push_back(Ticket::new(id, ticket_type, created_round));
        id
    }

    /// Session-2 capacity check: does `player` already own a ticket that is
    /// still in `todo`?
    #[must_use]
    pub fn player_has_todo_ticket(&self, player: PlayerId) -> bool {
        self.tickets
            .iter()
            .any(|t| t.assigned_to == Some(player) && t.status == TicketStatus::Todo)
    }

    /// Whether session 2 has been archived and the evaluation can be shown.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.session2_tickets.is_some()
    }

    /// Live and archived tickets.
    fn all_tickets(&self) -> impl Iterator<Item = &Ticket> {
        let archived = self
            .session1_tickets
            .iter()
            .chain(self.session2_tickets.iter())
            .flat_map(|tickets| tickets.iter());
        self.tickets.iter().chain(archived)
    }

    /// Check a decoded snapshot against the board invariants before it is
    /// installed.
    pub fn validate(&self, rules: &GameRules) -> Result<(), SnapshotError> {
        if !(1..=rules.max_rounds).contains(&self.round) {
            return Err(SnapshotError::RoundOutOfRange {
                round: self.round,
                max: rules.max_rounds,
            });
        }
        for ticket in self.all_tickets() {
            if ticket.points.phase1 > PHASE_CAPACITY || ticket.points.phase2 > PHASE_CAPACITY {
                return Err(SnapshotError::PhaseOverCapacity(ticket.id));
            }
            if ticket.blocker_points >= rules.blocker_threshold {
                return Err(SnapshotError::BlockerOverThreshold(ticket.id));
            }
        }
        if let Some((&player, &value)) = self
            .dice_values
            .iter()
            .find(|&(_, &value)| !(1..=DIE_FACES).contains(&value))
        {
            return Err(SnapshotError::InvalidDiceValue { player, value });
        }
        Ok(())
    }

    /// Move both id counters past every id this state knows about, and
    /// never below the counters of `previous`.
    pub(crate) fn resync_ids(&mut self, previous: &GameState) -> Result<(), SnapshotError> {
        let highest_ticket = self.all_tickets().map(|t| t.id.raw()).max().unwrap_or(0);
        let highest_player = self.players.iter().map(|p| p.id.raw()).max().unwrap_or(0);

        let next_ticket = highest_ticket
            .checked_add(1)
            .ok_or(SnapshotError::IdSpaceExhausted)?;
        let next_player = highest_player
            .checked_add(1)
            .ok_or(SnapshotError::IdSpaceExhausted)?;

        self.next_ticket_id = previous.next_ticket_id.max(next_ticket);
        self.next_player_id = previous.next_player_id.max(next_player);
        Ok(())
    }
}
