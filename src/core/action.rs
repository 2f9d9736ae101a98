//! Player actions.
//!
//! Each gesture a front end supports maps to one `Action`, applied on
//! behalf of a player with [`GameEngine::apply`](crate::rules::GameEngine::apply).
//! Every action is attributable to a player, so the engine snapshots that
//! player's undo history before it runs.

use serde::{Deserialize, Serialize};

use super::ticket::{TicketId, TicketStatus};

/// A player-attributed game action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Action {
    /// Roll this round's die.
    RollDice,

    /// Take a ticket as primary assignee.
    Assign { ticket: TicketId },

    /// Join a colleague's ticket as helper (session 2).
    AssignHelper { ticket: TicketId },

    /// Drag a ticket to a column.
    Move { ticket: TicketId, to: TicketStatus },

    /// Click a ticket to push it one column to the right.
    Advance { ticket: TicketId },

    /// Drop the player's remaining die capacity on a ticket.
    Spend { ticket: TicketId },

    /// Roll back the player's last action.
    Undo,
}

impl Action {
    /// The ticket this action targets, if any.
    #[must_use]
    pub fn ticket(&self) -> Option<TicketId> {
        match *self {
            Action::Assign { ticket }
            | Action::AssignHelper { ticket }
            | Action::Move { ticket, .. }
            | Action::Advance { ticket }
            | Action::Spend { ticket } => Some(ticket),
            Action::RollDice | Action::Undo => None,
        }
    }

    /// Whether the engine records an undo snapshot before running this action.
    #[must_use]
    pub fn is_undoable(&self) -> bool {
        !matches!(self, Action::Undo)
    }
}
