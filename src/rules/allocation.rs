//! Point allocation: turning die capacity into progress.
//!
//! ## Blocked tickets
//!
//! Only capacities of at least [`GameRules::min_blocker_roll`] count. A
//! qualifying die is spent whole on the blocker; anything smaller bounces
//! off and is not consumed.
//!
//! ## Unblocked tickets
//!
//! Points go to `phase1` until it is full, then to `phase2`. The amount
//! applied is `min(capacity, points still missing)`; the rest stays on
//! the die.
//!
//! ## Helping (session 2)
//!
//! A player working a ticket whose primary assignee is someone else
//! contributes half their capacity, rounded down, and is recorded as the
//! ticket's helper.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{EngineError, GameRules, GameState, Phase, PlayerId, TicketId};

/// What a spent die went into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationTarget {
    Blocker,
    Phase1,
    Phase2,
}

impl From<Phase> for AllocationTarget {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Phase1 => AllocationTarget::Phase1,
            Phase::Phase2 => AllocationTarget::Phase2,
        }
    }
}

/// Result of a successful allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub target: AllocationTarget,
    /// Capacity after the collaboration discount.
    pub effective: u8,
    /// Points actually added.
    pub applied: u8,
    /// Capacity left on the die (0 means the die was removed).
    pub remaining: u8,
    /// The blocker reached its threshold and was removed.
    pub blocker_cleared: bool,
    /// The acting player contributed as a helper.
    pub helped: bool,
}

/// Spend `capacity` from `player`'s die on a ticket.
///
/// On success the dice pool is updated: the die is removed when nothing is
/// left, otherwise it keeps the leftover. On error nothing changes.
pub fn allocate(
    state: &mut GameState,
    rules: &GameRules,
    ticket_id: TicketId,
    capacity: u8,
    player: PlayerId,
) -> Result<Allocation, EngineError> {
    let collaborative = state.session.is_collaborative();
    let ticket = state
        .ticket_mut(ticket_id)
        .ok_or(EngineError::UnknownTicket(ticket_id))?;

    let helping =
        collaborative && ticket.assigned_to.is_some_and(|primary| primary != player);

    let allocation = if ticket.has_blocker {
        if capacity < rules.min_blocker_roll {
            return Err(EngineError::BlockerNeedsHigherRoll {
                ticket: ticket_id,
                capacity,
                minimum: rules.min_blocker_roll,
            });
        }
        let cleared = ticket.add_blocker_points(capacity, rules.blocker_threshold);
        Allocation {
            target: AllocationTarget::Blocker,
            effective: capacity,
            applied: capacity,
            remaining: 0,
            blocker_cleared: cleared,
            helped: helping,
        }
    } else {
        let phase = ticket.active_phase().ok_or(EngineError::NoProgress(ticket_id))?;
        let effective = if helping { capacity / 2 } else { capacity };
        let amount = effective.min(ticket.remaining_in(phase));
        if amount == 0 {
            return Err(EngineError::NoProgress(ticket_id));
        }
        let applied = ticket.add_points(phase, amount);
        Allocation {
            target: phase.into(),
            effective,
            applied,
            remaining: effective - applied,
            blocker_cleared: false,
            helped: helping,
        }
    };

    if helping && ticket.assigned_to2.is_none() {
        ticket.assigned_to2 = Some(player);
    }

    if allocation.remaining == 0 {
        state.dice_values.remove(&player);
    } else {
        state.dice_values.insert(player, allocation.remaining);
    }

    debug!(
        ticket = %ticket_id,
        %player,
        capacity,
        applied = allocation.applied,
        remaining = allocation.remaining,
        target = ?allocation.target,
        "allocated die"
    );
    Ok(allocation)
}
