//! Game rules configuration.
//!
//! The engine reads the game's tunable constants from `GameRules`: rounds
//! per session, the blocker gate, and the scripted events injected at the
//! start of certain rounds. The defaults are the standard facilitated game.

use serde::{Deserialize, Serialize};

use super::ticket::TicketType;

/// Blockers dropped on in-progress tickets when a round is entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockerWave {
    /// Round being entered.
    pub round: u32,
    /// Share of eligible tickets to block, in percent (rounded up).
    pub percent: u32,
}

impl BlockerWave {
    /// How many of `eligible` tickets this wave blocks: `ceil(eligible × percent / 100)`.
    #[must_use]
    pub fn count(&self, eligible: usize) -> usize {
        let percent = self.percent as usize;
        (eligible * percent).div_ceil(100)
    }
}

/// Special tickets created when a round is entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketWave {
    /// Round being entered.
    pub round: u32,
    /// Type of the injected tickets.
    pub ticket_type: TicketType,
}

/// Complete rules configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameRules {
    /// Rounds per session (default: 10).
    pub max_rounds: u32,

    /// Blocker points needed to clear a blocker (default: 4).
    pub blocker_threshold: u8,

    /// Smallest die capacity accepted against a blocker (default: 4).
    pub min_blocker_roll: u8,

    /// Blocker waves (default: rounds 3, 6, 8 at 30%, 40%, 30%).
    pub blocker_waves: Vec<BlockerWave>,

    /// Special ticket waves (default: round 4 urgent, round 5 fixed-date).
    pub ticket_waves: Vec<TicketWave>,

    /// Special tickets per player, as `(numerator, denominator)`, rounded up
    /// (default: 2/3).
    pub tickets_per_player: (u32, u32),
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            blocker_threshold: 4,
            min_blocker_roll: 4,
            blocker_waves: vec![
                BlockerWave { round: 3, percent: 30 },
                BlockerWave { round: 6, percent: 40 },
                BlockerWave { round: 8, percent: 30 },
            ],
            ticket_waves: vec![
                TicketWave { round: 4, ticket_type: TicketType::Urgent },
                TicketWave { round: 5, ticket_type: TicketType::FixedDate },
            ],
            tickets_per_player: (2, 3),
        }
    }
}

impl GameRules {
    /// Set rounds per session.
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        assert!(rounds > 0, "A session needs at least 1 round");
        self.max_rounds = rounds;
        self
    }

    /// Replace the blocker waves.
    #[must_use]
    pub fn with_blocker_waves(mut self, waves: Vec<BlockerWave>) -> Self {
        self.blocker_waves = waves;
        self
    }

    /// Replace the special ticket waves.
    #[must_use]
    pub fn with_ticket_waves(mut self, waves: Vec<TicketWave>) -> Self {
        self.ticket_waves = waves;
        self
    }

    /// The blocker wave for a round being entered, if any.
    #[must_use]
    pub fn blocker_wave(&self, round: u32) -> Option<&BlockerWave> {
        self.blocker_waves.iter().find(|w| w.round == round)
    }

    /// The ticket wave for a round being entered, if any.
    #[must_use]
    pub fn ticket_wave(&self, round: u32) -> Option<&TicketWave> {
        self.ticket_waves.iter().find(|w| w.round == round)
    }

    /// Special tickets created for `player_count` players.
    #[must_use]
    pub fn special_ticket_count(&self, player_count: usize) -> usize {
        let (num, den) = self.tickets_per_player;
        (player_count * num as usize).div_ceil(den.max(1) as usize)
    }
}
