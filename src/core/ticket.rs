//! Tickets: the work items players push through the board.
//!
//! ## Pipeline
//!
//! `todo → phase1 → check → phase2 → done`
//!
//! Each ticket carries two progress counters (one per work phase), an
//! optional blocker, and the round numbers at which it was created,
//! first started, and finished. The round stamps feed the flow metrics.
//!
//! Ids are assigned from a per-game counter and serialised as strings,
//! matching the board's wire format.

use serde::{Deserialize, Serialize};
use std::num::ParseIntError;
use std::str::FromStr;

use super::player::PlayerId;

/// Points needed to finish one work phase.
pub const PHASE_CAPACITY: u8 = 6;

/// Ticket identifier, unique within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TicketId(pub u32);

impl TicketId {
    /// Create a new ticket ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw counter value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TicketId {
    type Err = ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse().map(Self)
    }
}

impl From<TicketId> for String {
    fn from(id: TicketId) -> Self {
        id.0.to_string()
    }
}

impl TryFrom<String> for TicketId {
    type Error = ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Ticket class. Fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketType {
    Normal,
    /// Injected when the scheduler enters the urgent round.
    Urgent,
    /// Injected when the scheduler enters the fixed-date round.
    FixedDate,
}

/// Pipeline position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Backlog column. Older boards called this `backlog`.
    #[serde(alias = "backlog")]
    Todo,
    Phase1,
    Check,
    Phase2,
    Done,
}

impl TicketStatus {
    /// All statuses in pipeline order.
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::Todo,
        TicketStatus::Phase1,
        TicketStatus::Check,
        TicketStatus::Phase2,
        TicketStatus::Done,
    ];

    /// Whether this status counts as work in progress.
    #[must_use]
    pub const fn is_in_progress(self) -> bool {
        matches!(self, TicketStatus::Phase1 | TicketStatus::Check | TicketStatus::Phase2)
    }

    /// Whether the scheduler may drop a blocker on a ticket in this status.
    #[must_use]
    pub const fn is_blockable(self) -> bool {
        matches!(self, TicketStatus::Phase1 | TicketStatus::Phase2)
    }

    /// The next status in pipeline order, `None` from `Done`.
    #[must_use]
    pub const fn successor(self) -> Option<TicketStatus> {
        match self {
            TicketStatus::Todo => Some(TicketStatus::Phase1),
            TicketStatus::Phase1 => Some(TicketStatus::Check),
            TicketStatus::Check => Some(TicketStatus::Phase2),
            TicketStatus::Phase2 => Some(TicketStatus::Done),
            TicketStatus::Done => None,
        }
    }
}

/// Work phase that receives die points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Phase1,
    Phase2,
}

/// Progress counters, each capped at [`PHASE_CAPACITY`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhasePoints {
    pub phase1: u8,
    pub phase2: u8,
}

impl PhasePoints {
    #[must_use]
    pub const fn get(&self, phase: Phase) -> u8 {
        match phase {
            Phase::Phase1 => self.phase1,
            Phase::Phase2 => self.phase2,
        }
    }

    fn get_mut(&mut self, phase: Phase) -> &mut u8 {
        match phase {
            Phase::Phase1 => &mut self.phase1,
            Phase::Phase2 => &mut self.phase2,
        }
    }
}

/// A work item on the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,

    #[serde(rename = "type")]
    pub ticket_type: TicketType,

    pub status: TicketStatus,

    pub points: PhasePoints,

    pub has_blocker: bool,

    /// Progress toward clearing the blocker. Meaningful only while blocked.
    #[serde(default)]
    pub blocker_points: u8,

    /// Primary assignee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<PlayerId>,

    /// Helper assignee (second session only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to2: Option<PlayerId>,

    pub created_round: u32,

    /// Set once, the first time the ticket reaches `done`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_round: Option<u32>,

    /// Set once, the first time the ticket enters an in-progress column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress_entered_round: Option<u32>,
}

impl Ticket {
    /// Create a fresh, unassigned ticket in `todo`.
    #[must_use]
    pub fn new(id: TicketId, ticket_type: TicketType, created_round: u32) -> Self {
        Self {
            id,
            ticket_type,
            status: TicketStatus::Todo,
            points: PhasePoints::default(),
            has_blocker: false,
            blocker_points: 0,
            assigned_to: None,
            assigned_to2: None,
            created_round,
            completed_round: None,
            in_progress_entered_round: None,
        }
    }

    /// The phase that currently receives points, `None` once both are full.
    #[must_use]
    pub fn active_phase(&self) -> Option<Phase> {
        if self.points.phase1 < PHASE_CAPACITY {
            Some(Phase::Phase1)
        } else if self.points.phase2 < PHASE_CAPACITY {
            Some(Phase::Phase2)
        } else {
            None
        }
    }

    /// Points still missing from `phase`.
    #[must_use]
    pub fn remaining_in(&self, phase: Phase) -> u8 {
        PHASE_CAPACITY.saturating_sub(self.points.get(phase))
    }

    /// Add points to a phase, clamped to capacity. Returns the amount applied.
    pub fn add_points(&mut self, phase: Phase, amount: u8) -> u8 {
        let applied = amount.min(self.remaining_in(phase));
        *self.points.get_mut(phase) += applied;
        applied
    }

    /// Attach a fresh blocker.
    pub fn block(&mut self) {
        self.has_blocker = true;
        self.blocker_points = 0;
    }

    /// Add blocker points. Clears the blocker once `threshold` is reached.
    ///
    /// Returns true if the blocker was cleared.
    pub fn add_blocker_points(&mut self, amount: u8, threshold: u8) -> bool {
        let total = self.blocker_points.saturating_add(amount);
        if total >= threshold {
            self.has_blocker = false;
            self.blocker_points = 0;
            true
        } else {
            self.blocker_points = total;
            false
        }
    }

    /// Move to `status`, stamping the lifecycle rounds the first time.
    pub fn set_status(&mut self, status: TicketStatus, round: u32) {
        if status.is_in_progress() && self.in_progress_entered_round.is_none() {
            self.in_progress_entered_round = Some(round);
        }
        if status == TicketStatus::Done && self.completed_round.is_none() {
            self.completed_round = Some(round);
        }
        self.status = status;
    }

    /// Rounds from creation to completion, if finished.
    #[must_use]
    pub fn lead_time(&self) -> Option<u32> {
        self.completed_round
            .map(|done| done.saturating_sub(self.created_round))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_id_string_wire_format() {
        let id = TicketId::new(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7\"");

        let parsed: TicketId = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(parsed, TicketId::new(12));

        assert!(serde_json::from_str::<TicketId>("\"abc\"").is_err());
    }

    #[test]
    fn test_ticket_type_names() {
        assert_eq!(serde_json::to_string(&TicketType::FixedDate).unwrap(), "\"fixed-date\"");
        assert_eq!(serde_json::to_string(&TicketType::Urgent).unwrap(), "\"urgent\"");
    }

    #[test]
    fn test_backlog_alias_reads_as_todo() {
        let status: TicketStatus = serde_json::from_str("\"backlog\"").unwrap();
        assert_eq!(status, TicketStatus::Todo);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"todo\"");
    }

    #[test]
    fn test_successor_order() {
        let mut status = TicketStatus::Todo;
        let mut seen = vec![status];
        while let Some(next) = status.successor() {
            seen.push(next);
            status = next;
        }
        assert_eq!(seen, TicketStatus::ALL.to_vec());
    }

    #[test]
    fn test_add_points_clamps_and_rolls_phase() {
        let mut ticket = Ticket::new(TicketId::new(1), TicketType::Normal, 1);

        assert_eq!(ticket.add_points(Phase::Phase1, 4), 4);
        assert_eq!(ticket.add_points(Phase::Phase1, 5), 2);
        assert_eq!(ticket.points.phase1, PHASE_CAPACITY);
        assert_eq!(ticket.active_phase(), Some(Phase::Phase2));

        ticket.add_points(Phase::Phase2, 6);
        assert_eq!(ticket.active_phase(), None);
    }

    #[test]
    fn test_blocker_clears_at_threshold() {
        let mut ticket = Ticket::new(TicketId::new(1), TicketType::Normal, 1);
        ticket.block();

        assert!(!ticket.add_blocker_points(2, 4));
        assert_eq!(ticket.blocker_points, 2);
        assert!(ticket.add_blocker_points(3, 4));
        assert!(!ticket.has_blocker);
        assert_eq!(ticket.blocker_points, 0);
    }

    #[test]
    fn test_round_stamps_set_once() {
        let mut ticket = Ticket::new(TicketId::new(1), TicketType::Normal, 1);

        ticket.set_status(TicketStatus::Phase1, 2);
        ticket.set_status(TicketStatus::Phase2, 4);
        assert_eq!(ticket.in_progress_entered_round, Some(2));

        ticket.set_status(TicketStatus::Done, 5);
        ticket.set_status(TicketStatus::Phase2, 6);
        ticket.set_status(TicketStatus::Done, 7);
        assert_eq!(ticket.completed_round, Some(5));
        assert_eq!(ticket.lead_time(), Some(4));
    }

    #[test]
    fn test_ticket_wire_shape() {
        let mut ticket = Ticket::new(TicketId::new(3), TicketType::Urgent, 4);
        ticket.assigned_to = Some(PlayerId::new(2));

        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["id"], "3");
        assert_eq!(json["type"], "urgent");
        assert_eq!(json["status"], "todo");
        assert_eq!(json["points"]["phase1"], 0);
        assert_eq!(json["hasBlocker"], false);
        assert_eq!(json["assignedTo"], 2);
        assert_eq!(json["createdRound"], 4);
        assert!(json.get("assignedTo2").is_none());

        let back: Ticket = serde_json::from_value(json).unwrap();
        assert_eq!(back, ticket);
    }
}
