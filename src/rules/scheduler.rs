//! Round and session scheduling.
//!
//! Each call to [`next_round`] either enters the next round of the current
//! session, running that round's scripted events, or closes the session:
//!
//! - Rounds below the last: increment, clear every player's roll, then
//!   drop blocker waves on in-progress tickets and inject special tickets
//!   as configured in [`GameRules`].
//! - Last round of session 1: archive the tickets, start session 2 at
//!   round 1 with an empty board.
//! - Last round of session 2: archive the tickets and return to round 1 as
//!   the signal that the evaluation can be shown. There is no session 3.
//!
//! Blocker placement is the only random step and draws from the
//! [`GameRng`] passed in.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::core::{GameRng, GameRules, GameState, Session, TicketId};

/// What happened when the round advanced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Round now in play.
    pub round: u32,
    /// Session now in play.
    pub session: Session,
    /// Tickets that received a blocker on entry.
    pub blocked: SmallVec<[TicketId; 4]>,
    /// Tickets created on entry.
    pub created: SmallVec<[TicketId; 4]>,
    /// Session that was archived by this call, if any.
    pub session_ended: Option<Session>,
}

/// Advance the round (or close the session). Never fails.
pub fn next_round(state: &mut GameState, rules: &GameRules, rng: &mut GameRng) -> RoundReport {
    if state.round >= rules.max_rounds {
        return end_session(state);
    }

    let previous = state.round;
    state.round += 1;
    state.reset_round_flags();

    let mut report = RoundReport {
        round: state.round,
        session: state.session,
        ..RoundReport::default()
    };

    if let Some(wave) = rules.blocker_wave(state.round) {
        let eligible: Vec<usize> = state
            .tickets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.status.is_blockable() && !t.has_blocker)
            .map(|(i, _)| i)
            .collect();
        let count = wave.count(eligible.len());
        for pick in rng.sample_indices(eligible.len(), count) {
            if let Some(ticket) = state.tickets.get_mut(eligible[pick]) {
                ticket.block();
                report.blocked.push(ticket.id);
            }
        }
    }

    if let Some(wave) = rules.ticket_wave(state.round) {
        // Injected tickets carry the round they were announced in.
        for _ in 0..rules.special_ticket_count(state.player_count()) {
            let id = state.push_ticket(wave.ticket_type, previous);
            report.created.push(id);
        }
    }

    debug!(
        round = state.round,
        session = %state.session,
        blocked = report.blocked.len(),
        created = report.created.len(),
        "entered round"
    );
    report
}

fn end_session(state: &mut GameState) -> RoundReport {
    let ended = state.session;
    let archived = std::mem::take(&mut state.tickets);
    info!(session = %ended, tickets = archived.len(), "session ended");

    match ended {
        Session::First => {
            state.session1_tickets = Some(archived);
            state.session = Session::Second;
        }
        Session::Second => {
            state.session2_tickets = Some(archived);
        }
    }
    state.round = 1;
    state.reset_round_flags();

    RoundReport {
        round: state.round,
        session: state.session,
        session_ended: Some(ended),
        ..RoundReport::default()
    }
}
