//! Player identification and per-player rows.
//!
//! ## PlayerId
//!
//! Type-safe player identifier. Ids are 1-based and stay stable for the
//! lifetime of a game: removing a player never renumbers the others.
//!
//! ## Player
//!
//! The row shown for each participant: name, host flag, and the
//! per-round dice gate.

use serde::{Deserialize, Serialize};

use super::ticket::TicketId;

/// Player identifier.
///
/// Ids are 1-based: the first player to join is `PlayerId(1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

/// A participant in the game.
///
/// `current_dice_roll` holds the face rolled this round (the remaining
/// capacity of that die lives in the shared dice pool, not here).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,

    pub name: String,

    /// Face value rolled this round, cleared when the round advances.
    pub current_dice_roll: Option<u8>,

    /// Ticket most recently assigned to this player as primary.
    #[serde(default)]
    pub current_ticket: Option<TicketId>,

    pub is_host: bool,

    /// Set by a roll, reset at every round boundary.
    pub has_rolled_this_round: bool,
}

impl Player {
    /// Create a player row that has not rolled yet.
    pub fn new(id: PlayerId, name: impl Into<String>, is_host: bool) -> Self {
        Self {
            id,
            name: name.into(),
            current_dice_roll: None,
            current_ticket: None,
            is_host,
            has_rolled_this_round: false,
        }
    }

    /// Clear the round-scoped dice fields.
    pub fn reset_round(&mut self) {
        self.has_rolled_this_round = false;
        self.current_dice_roll = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_basics() {
        let p1 = PlayerId::new(1);

        assert_eq!(p1.raw(), 1);
        assert_eq!(format!("{}", p1), "Player 1");
    }

    #[test]
    fn test_player_reset_round() {
        let mut player = Player::new(PlayerId::new(1), "Ada", true);
        player.current_dice_roll = Some(5);
        player.has_rolled_this_round = true;

        player.reset_round();

        assert_eq!(player.current_dice_roll, None);
        assert!(!player.has_rolled_this_round);
        assert!(player.is_host);
    }

    #[test]
    fn test_player_wire_shape() {
        let player = Player::new(PlayerId::new(2), "Grace", false);
        let json = serde_json::to_value(&player).unwrap();

        assert_eq!(json["id"], 2);
        assert_eq!(json["name"], "Grace");
        assert_eq!(json["currentDiceRoll"], serde_json::Value::Null);
        assert_eq!(json["isHost"], false);
        assert_eq!(json["hasRolledThisRound"], false);
    }

    #[test]
    fn test_player_missing_current_ticket_defaults() {
        let json = r#"{"id":1,"name":"Ada","currentDiceRoll":3,"isHost":true,"hasRolledThisRound":true}"#;
        let player: Player = serde_json::from_str(json).unwrap();

        assert_eq!(player.current_ticket, None);
        assert_eq!(player.current_dice_roll, Some(3));
    }
}
