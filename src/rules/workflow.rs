//! Ticket workflow: column moves and assignment.
//!
//! Moves only happen on explicit request; the engine never infers a
//! transition from points. Blocked tickets refuse both moves and
//! reassignment until their blocker is worked off.
//!
//! In session 2 the `check` column is elided: a request out of `check`,
//! or into it, resolves to `phase2`.

use tracing::debug;

use crate::core::{EngineError, GameState, PlayerId, Session, TicketId, TicketStatus};

/// The column a move request actually lands in for `session`.
#[must_use]
pub fn resolve_target(session: Session, from: TicketStatus, to: TicketStatus) -> TicketStatus {
    if session.is_collaborative() && (from == TicketStatus::Check || to == TicketStatus::Check) {
        TicketStatus::Phase2
    } else {
        to
    }
}

/// The column a click moves a ticket to, if clicking is allowed from `from`.
///
/// Tickets leave `todo` only by being dragged, and `done` is terminal.
#[must_use]
pub fn click_target(session: Session, from: TicketStatus) -> Option<TicketStatus> {
    if from == TicketStatus::Todo {
        return None;
    }
    let next = from.successor()?;
    Some(resolve_target(session, from, next))
}

/// Move a ticket to `to` (after session-2 check elision).
///
/// Stamps `in_progress_entered_round` and `completed_round` the first time
/// the ticket reaches those columns. Returns the status actually applied.
pub fn move_ticket(
    state: &mut GameState,
    ticket_id: TicketId,
    to: TicketStatus,
) -> Result<TicketStatus, EngineError> {
    let session = state.session;
    let round = state.round;
    let ticket = state
        .ticket_mut(ticket_id)
        .ok_or(EngineError::UnknownTicket(ticket_id))?;

    if ticket.has_blocker {
        return Err(EngineError::TicketBlocked(ticket_id));
    }

    let target = resolve_target(session, ticket.status, to);
    debug!(ticket = %ticket_id, from = ?ticket.status, to = ?target, round, "moving ticket");
    ticket.set_status(target, round);
    Ok(target)
}

/// Push a ticket one column to the right, as a click on the board does.
pub fn advance_ticket(state: &mut GameState, ticket_id: TicketId) -> Result<TicketStatus, EngineError> {
    let ticket = state
        .ticket(ticket_id)
        .ok_or(EngineError::UnknownTicket(ticket_id))?;
    let target =
        click_target(state.session, ticket.status).ok_or(EngineError::NoNextColumn(ticket_id))?;
    move_ticket(state, ticket_id, target)
}

/// Make `player` the ticket's primary assignee.
///
/// The player's `current_ticket` follows; whoever held the ticket before
/// loses it.
pub fn assign(state: &mut GameState, ticket_id: TicketId, player: PlayerId) -> Result<(), EngineError> {
    if state.player(player).is_none() {
        return Err(EngineError::UnknownPlayer(player));
    }
    let ticket = state
        .ticket_mut(ticket_id)
        .ok_or(EngineError::UnknownTicket(ticket_id))?;
    if ticket.has_blocker {
        return Err(EngineError::TicketBlocked(ticket_id));
    }
    ticket.assigned_to = Some(player);
    if ticket.assigned_to2 == Some(player) {
        ticket.assigned_to2 = None;
    }

    for row in &mut state.players {
        if row.id == player {
            row.current_ticket = Some(ticket_id);
        } else if row.current_ticket == Some(ticket_id) {
            row.current_ticket = None;
        }
    }
    debug!(ticket = %ticket_id, %player, "assigned ticket");
    Ok(())
}

/// Attach `player` to the ticket as helper. Session 2 only, and the
/// helper must differ from the primary assignee.
pub fn assign_helper(
    state: &mut GameState,
    ticket_id: TicketId,
    player: PlayerId,
) -> Result<(), EngineError> {
    if !state.session.is_collaborative() {
        return Err(EngineError::HelperOutsideSession2);
    }
    if state.player(player).is_none() {
        return Err(EngineError::UnknownPlayer(player));
    }
    let ticket = state
        .ticket_mut(ticket_id)
        .ok_or(EngineError::UnknownTicket(ticket_id))?;
    if ticket.has_blocker {
        return Err(EngineError::TicketBlocked(ticket_id));
    }
    if ticket.assigned_to == Some(player) {
        return Err(EngineError::HelperIsPrimary { ticket: ticket_id, player });
    }
    ticket.assigned_to2 = Some(player);
    debug!(ticket = %ticket_id, %player, "helper joined ticket");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Player, TicketType};

    fn state_with_ticket(session: Session) -> (GameState, TicketId) {
        let mut state = GameState::new();
        state.session = session;
        state.players.push(Player::new(PlayerId::new(1), "Ada", true));
        state.players.push(Player::new(PlayerId::new(2), "Grace", false));
        let id = state.push_ticket(TicketType::Normal, 1);
        (state, id)
    }

    #[test]
    fn test_session1_walks_every_column() {
        let (mut state, id) = state_with_ticket(Session::First);
        if let Some(t) = state.ticket_mut(id) {
            t.set_status(TicketStatus::Phase1, 1);
        }

        let mut seen = Vec::new();
        while let Ok(status) = advance_ticket(&mut state, id) {
            seen.push(status);
        }

        assert_eq!(seen, vec![TicketStatus::Check, TicketStatus::Phase2, TicketStatus::Done]);
        assert_eq!(
            advance_ticket(&mut state, id),
            Err(EngineError::NoNextColumn(id))
        );
    }

    #[test]
    fn test_session2_skips_check() {
        assert_eq!(
            click_target(Session::Second, TicketStatus::Phase1),
            Some(TicketStatus::Phase2)
        );
        assert_eq!(
            click_target(Session::Second, TicketStatus::Check),
            Some(TicketStatus::Phase2)
        );
        assert_eq!(
            resolve_target(Session::Second, TicketStatus::Check, TicketStatus::Done),
            TicketStatus::Phase2
        );
        assert_eq!(
            resolve_target(Session::First, TicketStatus::Phase1, TicketStatus::Check),
            TicketStatus::Check
        );
    }

    #[test]
    fn test_session2_move_into_check_lands_in_phase2() {
        let (mut state, id) = state_with_ticket(Session::Second);

        assert_eq!(move_ticket(&mut state, id, TicketStatus::Check), Ok(TicketStatus::Phase2));
        assert_eq!(state.ticket(id).map(|t| t.status), Some(TicketStatus::Phase2));
    }

    #[test]
    fn test_click_from_todo_not_allowed() {
        assert_eq!(click_target(Session::First, TicketStatus::Todo), None);
        assert_eq!(click_target(Session::First, TicketStatus::Done), None);
    }

    #[test]
    fn test_blocked_ticket_refuses_moves() {
        let (mut state, id) = state_with_ticket(Session::First);
        if let Some(t) = state.ticket_mut(id) {
            t.block();
        }

        assert_eq!(
            move_ticket(&mut state, id, TicketStatus::Phase1),
            Err(EngineError::TicketBlocked(id))
        );
        assert_eq!(
            assign(&mut state, id, PlayerId::new(1)),
            Err(EngineError::TicketBlocked(id))
        );
        assert_eq!(state.ticket(id).map(|t| t.status), Some(TicketStatus::Todo));
    }

    #[test]
    fn test_move_stamps_rounds() {
        let (mut state, id) = state_with_ticket(Session::First);
        state.round = 3;
        move_ticket(&mut state, id, TicketStatus::Phase1).unwrap();
        state.round = 7;
        move_ticket(&mut state, id, TicketStatus::Done).unwrap();

        let ticket = state.ticket(id).unwrap();
        assert_eq!(ticket.in_progress_entered_round, Some(3));
        assert_eq!(ticket.completed_round, Some(7));
    }

    #[test]
    fn test_assign_moves_current_ticket() {
        let (mut state, id) = state_with_ticket(Session::First);

        assign(&mut state, id, PlayerId::new(1)).unwrap();
        assign(&mut state, id, PlayerId::new(2)).unwrap();

        assert_eq!(state.ticket(id).unwrap().assigned_to, Some(PlayerId::new(2)));
        assert_eq!(state.player(PlayerId::new(1)).unwrap().current_ticket, None);
        assert_eq!(state.player(PlayerId::new(2)).unwrap().current_ticket, Some(id));
    }

    #[test]
    fn test_helper_rules() {
        let (mut state, id) = state_with_ticket(Session::First);
        assert_eq!(
            assign_helper(&mut state, id, PlayerId::new(2)),
            Err(EngineError::HelperOutsideSession2)
        );

        state.session = Session::Second;
        assign(&mut state, id, PlayerId::new(1)).unwrap();
        assert_eq!(
            assign_helper(&mut state, id, PlayerId::new(1)),
            Err(EngineError::HelperIsPrimary { ticket: id, player: PlayerId::new(1) })
        );

        assign_helper(&mut state, id, PlayerId::new(2)).unwrap();
        assert_eq!(state.ticket(id).unwrap().assigned_to2, Some(PlayerId::new(2)));
    }

    #[test]
    fn test_unknown_ticket() {
        let (mut state, _) = state_with_ticket(Session::First);
        let missing = TicketId::new(99);

        assert_eq!(
            move_ticket(&mut state, missing, TicketStatus::Phase1),
            Err(EngineError::UnknownTicket(missing))
        );
    }
}
