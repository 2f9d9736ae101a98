//! The game engine: single owner of a game's state.
//!
//! `GameEngine` ties the rules together:
//! - Player actions go through [`GameEngine::apply`], which snapshots the
//!   acting player's undo history first
//! - Facilitator controls (players, rounds, sessions, lobby) are plain
//!   methods
//! - The full state can be exported for the relay and replaced wholesale
//!   by a remote snapshot
//!
//! Several engines can live side by side (one per test, one per room);
//! there is no global state.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::allocation::{allocate, Allocation};
use super::scheduler::{next_round, RoundReport};
use super::workflow;
use crate::core::{
    Action, EngineError, GameRng, GameRngState, GameRules, GameState, Player, PlayerId, Session,
    SnapshotError, TicketId, TicketStatus, TicketType, DIE_FACES,
};
use crate::history::History;

/// Effect of a successfully applied action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Outcome {
    Rolled { face: u8 },
    Assigned,
    Moved { status: TicketStatus },
    Allocated { allocation: Allocation },
    Undone,
}

/// Owner of one game: rules, state, undo history and randomness.
#[derive(Clone, Debug)]
pub struct GameEngine {
    rules: GameRules,
    state: GameState,
    history: History,
    rng: GameRng,
    /// Bumped whenever the state is replaced wholesale (undo, remote sync).
    history_version: u64,
}

impl Default for GameEngine {
    /// Standard rules, seeded from the operating system.
    fn default() -> Self {
        Self::new(GameRules::default(), GameRng::from_entropy())
    }
}

impl GameEngine {
    /// Create an engine in the lobby state.
    #[must_use]
    pub fn new(rules: GameRules, rng: GameRng) -> Self {
        Self {
            rules,
            state: GameState::new(),
            history: History::new(),
            rng,
            history_version: 0,
        }
    }

    /// Standard rules with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::new(GameRules::default(), GameRng::new(seed))
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn history_version(&self) -> u64 {
        self.history_version
    }

    #[must_use]
    pub fn rng_state(&self) -> GameRngState {
        self.rng.state()
    }

    // === Player actions ===

    /// Apply `action` on behalf of `player`.
    ///
    /// An undo snapshot is pushed before the action runs, even if the
    /// action is then rejected. Moves are attributed to the ticket's
    /// primary assignee when it has one. On `Err` the shared state is
    /// unchanged.
    pub fn apply(&mut self, player: PlayerId, action: Action) -> Result<Outcome, EngineError> {
        if self.state.player(player).is_none() {
            return Err(EngineError::UnknownPlayer(player));
        }
        if action.is_undoable() {
            let owner = self.attribute(player, &action);
            self.history.record(&self.state, owner);
        }

        let result = match action {
            Action::RollDice => self.roll_dice(player).map(|face| Outcome::Rolled { face }),
            Action::Assign { ticket } => {
                workflow::assign(&mut self.state, ticket, player).map(|()| Outcome::Assigned)
            }
            Action::AssignHelper { ticket } => {
                workflow::assign_helper(&mut self.state, ticket, player).map(|()| Outcome::Assigned)
            }
            Action::Move { ticket, to } => {
                workflow::move_ticket(&mut self.state, ticket, to).map(|status| Outcome::Moved { status })
            }
            Action::Advance { ticket } => {
                workflow::advance_ticket(&mut self.state, ticket).map(|status| Outcome::Moved { status })
            }
            Action::Spend { ticket } => self
                .spend(player, ticket)
                .map(|allocation| Outcome::Allocated { allocation }),
            Action::Undo => self.undo(player).map(|()| Outcome::Undone),
        };

        if let Err(err) = &result {
            debug!(%player, ?action, %err, "action rejected");
        }
        result
    }

    /// Whose history an action is recorded in.
    fn attribute(&self, actor: PlayerId, action: &Action) -> PlayerId {
        match action {
            Action::Move { ticket, .. } | Action::Advance { ticket } => self
                .state
                .ticket(*ticket)
                .and_then(|t| t.assigned_to)
                .filter(|owner| self.state.player(*owner).is_some())
                .unwrap_or(actor),
            _ => actor,
        }
    }

    fn roll_dice(&mut self, player: PlayerId) -> Result<u8, EngineError> {
        let row = self
            .state
            .player_mut(player)
            .ok_or(EngineError::UnknownPlayer(player))?;
        if row.has_rolled_this_round {
            return Err(EngineError::AlreadyRolled(player));
        }
        let face = self.rng.roll_die();
        row.current_dice_roll = Some(face);
        row.has_rolled_this_round = true;
        self.state.dice_values.insert(player, face);
        debug!(%player, face, "rolled die");
        Ok(face)
    }

    fn spend(&mut self, player: PlayerId, ticket: TicketId) -> Result<Allocation, EngineError> {
        let capacity = self
            .state
            .dice_values
            .get(&player)
            .copied()
            .filter(|&c| c > 0)
            .ok_or(EngineError::NoDie(player))?;
        allocate(&mut self.state, &self.rules, ticket, capacity, player)
    }

    /// Spend an explicit capacity from `player`'s die. Used by front ends
    /// that track the dragged die value themselves.
    pub fn allocate(
        &mut self,
        player: PlayerId,
        ticket: TicketId,
        capacity: u8,
    ) -> Result<Allocation, EngineError> {
        if self.state.player(player).is_none() {
            return Err(EngineError::UnknownPlayer(player));
        }
        self.history.record(&self.state, player);
        allocate(&mut self.state, &self.rules, ticket, capacity, player)
    }

    /// Roll back `player`'s last action.
    pub fn undo(&mut self, player: PlayerId) -> Result<(), EngineError> {
        self.history.undo(&mut self.state, player)?;
        self.history_version += 1;
        Ok(())
    }

    // === Facilitator controls ===

    /// Add a player. The first player becomes host. Ids are never reused
    /// until the game returns to the lobby.
    pub fn add_player(&mut self, name: impl Into<String>) -> PlayerId {
        let id = self.state.take_player_id();
        let is_host = self.state.players.is_empty();
        if is_host {
            self.state.host_id = id;
        }
        let player = Player::new(id, name, is_host);
        info!(%id, name = %player.name, is_host, "player joined");
        self.state.players.push(player);
        id
    }

    /// Remove a player, their die and their undo stack. If they were host,
    /// the lowest remaining id takes over.
    ///
    /// Tickets keep the departed id in `assigned_to` / `assigned_to2`, so the
    /// board still shows who worked on them. The id is never handed out
    /// again, and moves on such tickets are recorded against whoever makes
    /// them.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<(), EngineError> {
        let before = self.state.players.len();
        self.state.players.retain(|p| p.id != id);
        if self.state.players.len() == before {
            return Err(EngineError::UnknownPlayer(id));
        }
        self.state.dice_values.remove(&id);
        self.history.remove(id);

        if self.state.host_id == id {
            if let Some(new_host) = self.state.players.iter().map(|p| p.id).min() {
                self.state.host_id = new_host;
                for player in &mut self.state.players {
                    player.is_host = player.id == new_host;
                }
                info!(old = %id, new = %new_host, "host reassigned");
            }
        }
        Ok(())
    }

    pub fn start_game(&mut self) {
        self.state.is_game_started = true;
        info!(players = self.state.player_count(), "game started");
    }

    /// Create a ticket by hand (host tool).
    pub fn add_ticket(&mut self, ticket_type: TicketType) -> TicketId {
        let round = self.state.round;
        self.state.push_ticket(ticket_type, round)
    }

    /// Advance the round, running its scripted events.
    pub fn next_round(&mut self) -> RoundReport {
        next_round(&mut self.state, &self.rules, &mut self.rng)
    }

    /// Jump straight to an empty session 2.
    pub fn skip_to_session2(&mut self) {
        self.state.session = Session::Second;
        self.state.round = 1;
        self.state.is_game_started = true;
        self.state.tickets.clear();
        self.state.session1_tickets = None;
        info!("skipped to session 2");
    }

    /// Return to the lobby: no players, no tickets, no archives, no undo
    /// history, ticket numbering restarted.
    pub fn go_home(&mut self) {
        self.state = GameState::new();
        self.history.clear();
        self.history_version += 1;
        info!("returned to lobby");
    }

    pub fn clear_session1_tickets(&mut self) {
        self.state.session1_tickets = None;
    }

    pub fn clear_session2_tickets(&mut self) {
        self.state.session2_tickets = None;
    }

    /// Set a player's remaining die capacity. Zero removes the die.
    pub fn set_dice_value(&mut self, player: PlayerId, value: u8) -> Result<(), EngineError> {
        if value > DIE_FACES {
            return Err(EngineError::InvalidDiceValue(value));
        }
        if self.state.player(player).is_none() {
            return Err(EngineError::UnknownPlayer(player));
        }
        if value == 0 {
            self.state.dice_values.remove(&player);
        } else {
            self.state.dice_values.insert(player, value);
        }
        Ok(())
    }

    pub fn remove_dice_value(&mut self, player: PlayerId) {
        self.state.dice_values.remove(&player);
    }

    // === Queries ===

    #[must_use]
    pub fn is_host(&self, player: PlayerId) -> bool {
        self.state.is_host(player)
    }

    #[must_use]
    pub fn player_has_todo_ticket(&self, player: PlayerId) -> bool {
        self.state.player_has_todo_ticket(player)
    }

    // === Sync ===

    /// Full state as pushed to the relay in an `update`.
    pub fn sync_snapshot(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.state)
    }

    /// Replace the local state with a snapshot received from the room.
    ///
    /// A `null` snapshot (room not synced yet) is ignored and returns
    /// `Ok(false)`. A snapshot that breaks a board invariant is refused and
    /// the local state is left alone. Undo stacks are kept.
    pub fn apply_remote(&mut self, snapshot: serde_json::Value) -> Result<bool, SnapshotError> {
        if snapshot.is_null() {
            return Ok(false);
        }
        let mut state: GameState = serde_json::from_value(snapshot)?;
        if let Err(err) = state
            .validate(&self.rules)
            .and_then(|()| state.resync_ids(&self.state))
        {
            warn!(%err, "refused remote snapshot");
            return Err(err);
        }
        self.state = state;
        self.history_version += 1;
        debug!(
            round = self.state.round,
            session = %self.state.session,
            tickets = self.state.tickets.len(),
            "applied remote snapshot"
        );
        Ok(true)
    }
}
