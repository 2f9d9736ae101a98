//! Reasons an engine action had no effect.
//!
//! Every rejection leaves the shared state untouched. Front ends are
//! expected to treat them as silent no-ops (a die that bounces back, a
//! ticket that will not move); the variants exist so logs and tests can
//! tell why.

use super::player::PlayerId;
use super::ticket::TicketId;

/// A rejected engine action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("no ticket with id {0}")]
    UnknownTicket(TicketId),

    #[error("{0} is not in the game")]
    UnknownPlayer(PlayerId),

    /// Blocked tickets accept neither moves nor reassignment.
    #[error("ticket {0} is blocked")]
    TicketBlocked(TicketId),

    /// Blockers only accept large dice.
    #[error("ticket {ticket} needs a die of at least {minimum} to work its blocker, got {capacity}")]
    BlockerNeedsHigherRoll {
        ticket: TicketId,
        capacity: u8,
        minimum: u8,
    },

    /// Nothing could be applied: both phases are full or the effective
    /// capacity rounded down to zero.
    #[error("ticket {0} cannot take any more points from this die")]
    NoProgress(TicketId),

    #[error("{0} has no die to spend")]
    NoDie(PlayerId),

    #[error("{0} has already rolled this round")]
    AlreadyRolled(PlayerId),

    #[error("dice capacity must be between 0 and 6, got {0}")]
    InvalidDiceValue(u8),

    /// Helpers exist only in the collaborative session.
    #[error("helpers can only be assigned in session 2")]
    HelperOutsideSession2,

    #[error("{player} is already the primary assignee of ticket {ticket}")]
    HelperIsPrimary { ticket: TicketId, player: PlayerId },

    /// Tickets leave the backlog by being dragged, not clicked.
    #[error("ticket {0} has no next column to advance to")]
    NoNextColumn(TicketId),

    #[error("{0} has nothing to undo")]
    NothingToUndo(PlayerId),
}

/// Why a remote snapshot was refused. The local state is kept as it was.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("round {round} is outside 1..={max}")]
    RoundOutOfRange { round: u32, max: u32 },

    #[error("ticket {0} has more points than a phase holds")]
    PhaseOverCapacity(TicketId),

    #[error("ticket {0} has reached its blocker threshold without clearing it")]
    BlockerOverThreshold(TicketId),

    #[error("{player} holds an impossible die value {value}")]
    InvalidDiceValue { player: PlayerId, value: u8 },

    /// An id so large that the next one would not fit.
    #[error("snapshot ids leave no room for new tickets or players")]
    IdSpaceExhausted,
}
