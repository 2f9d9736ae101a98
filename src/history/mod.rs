//! Per-player undo history.
//!
//! Before any action attributed to a player, the engine pushes a snapshot
//! of the *shared* tickets and dice pool plus that player's own row onto
//! the player's private stack. Undo pops one snapshot and restores it.
//!
//! Because snapshots hold the whole board, undoing player A can discard a
//! later edit made by player B. Stacks are popped by undo, dropped one at a
//! time when a player leaves, and cleared wholesale on return to the lobby.

use im::Vector;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::core::{DicePool, EngineError, GameState, Player, PlayerId, Ticket};

/// State captured before a player's action.
///
/// `tickets` and `dice_values` are persistent structures, so taking a
/// snapshot is O(1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub tickets: Vector<Ticket>,
    pub dice_values: DicePool,
    pub player: Player,
}

/// Undo stacks keyed by player.
#[derive(Clone, Debug, Default)]
pub struct History {
    stacks: FxHashMap<PlayerId, Vec<Snapshot>>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a snapshot for `player`. Returns false (and records nothing) if
    /// the player is not in the game.
    pub fn record(&mut self, state: &GameState, player: PlayerId) -> bool {
        let Some(row) = state.player(player) else {
            return false;
        };
        self.stacks.entry(player).or_default().push(Snapshot {
            tickets: state.tickets.clone(),
            dice_values: state.dice_values.clone(),
            player: row.clone(),
        });
        true
    }

    /// Roll back `player`'s most recent snapshot.
    ///
    /// Tickets and dice are restored wholesale; of the player rows only
    /// `player`'s own is restored. Empty history is an error and leaves
    /// the state untouched.
    pub fn undo(&mut self, state: &mut GameState, player: PlayerId) -> Result<(), EngineError> {
        let snapshot = self
            .stacks
            .get_mut(&player)
            .and_then(Vec::pop)
            .ok_or(EngineError::NothingToUndo(player))?;

        state.tickets = snapshot.tickets;
        state.dice_values = snapshot.dice_values;
        if let Some(row) = state.player_mut(player) {
            *row = snapshot.player;
        }
        debug!(%player, remaining = self.depth(player), "undid action");
        Ok(())
    }

    /// Number of snapshots waiting for `player`.
    #[must_use]
    pub fn depth(&self, player: PlayerId) -> usize {
        self.stacks.get(&player).map_or(0, Vec::len)
    }

    /// Forget `player`'s stack.
    pub fn remove(&mut self, player: PlayerId) {
        self.stacks.remove(&player);
    }

    /// Drop every stack.
    pub fn clear(&mut self) {
        self.stacks.clear();
    }
}
